//! IAM policy bundle for Kubernetes worker nodes.
//!
//! Inline policy documents for the cluster add-ons the node role needs:
//! autoscaler, ALB ingress, App Mesh, cert-manager, storage drivers and
//! X-Ray. Consumed by the cluster tiles; declares no resources itself.

use serde_json::{json, Value as Json};

/// One named policy document.
#[derive(Debug, Clone)]
pub struct NodePolicy {
    pub name: &'static str,
    pub document: Json,
}

fn statement(actions: &[&str], resources: &[&str]) -> Json {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Action": actions,
                "Resource": resources,
            }
        ]
    })
}

/// The full node policy bundle, in a stable order.
pub fn node_policies() -> Vec<NodePolicy> {
    vec![
        NodePolicy {
            name: "Autoscaler4Eks",
            document: statement(
                &[
                    "autoscaling:DescribeAutoScalingGroups",
                    "autoscaling:DescribeAutoScalingInstances",
                    "autoscaling:DescribeLaunchConfigurations",
                    "autoscaling:DescribeTags",
                    "autoscaling:SetDesiredCapacity",
                    "autoscaling:TerminateInstanceInAutoScalingGroup",
                    "ec2:DescribeLaunchTemplateVersions",
                ],
                &["*"],
            ),
        },
        NodePolicy {
            name: "AlbIngress",
            document: statement(
                &[
                    "acm:DescribeCertificate",
                    "acm:ListCertificates",
                    "acm:GetCertificate",
                    "ec2:AuthorizeSecurityGroupIngress",
                    "ec2:CreateSecurityGroup",
                    "ec2:CreateTags",
                    "ec2:DeleteTags",
                    "ec2:DeleteSecurityGroup",
                    "ec2:DescribeAccountAttributes",
                    "ec2:DescribeAddresses",
                    "ec2:DescribeInstances",
                    "ec2:DescribeInstanceStatus",
                    "ec2:DescribeInternetGateways",
                    "ec2:DescribeNetworkInterfaces",
                    "ec2:DescribeSecurityGroups",
                    "ec2:DescribeSubnets",
                    "ec2:DescribeTags",
                    "ec2:DescribeVpcs",
                    "ec2:ModifyInstanceAttribute",
                    "ec2:ModifyNetworkInterfaceAttribute",
                    "ec2:RevokeSecurityGroupIngress",
                    "elasticloadbalancing:AddListenerCertificates",
                    "elasticloadbalancing:AddTags",
                    "elasticloadbalancing:CreateListener",
                    "elasticloadbalancing:CreateLoadBalancer",
                    "elasticloadbalancing:CreateRule",
                    "elasticloadbalancing:CreateTargetGroup",
                    "elasticloadbalancing:DeleteListener",
                    "elasticloadbalancing:DeleteLoadBalancer",
                    "elasticloadbalancing:DeleteRule",
                    "elasticloadbalancing:DeleteTargetGroup",
                    "elasticloadbalancing:DeregisterTargets",
                    "elasticloadbalancing:DescribeListenerCertificates",
                    "elasticloadbalancing:DescribeListeners",
                    "elasticloadbalancing:DescribeLoadBalancers",
                    "elasticloadbalancing:DescribeLoadBalancerAttributes",
                    "elasticloadbalancing:DescribeRules",
                    "elasticloadbalancing:DescribeSSLPolicies",
                    "elasticloadbalancing:DescribeTags",
                    "elasticloadbalancing:DescribeTargetGroups",
                    "elasticloadbalancing:DescribeTargetGroupAttributes",
                    "elasticloadbalancing:DescribeTargetHealth",
                    "elasticloadbalancing:ModifyListener",
                    "elasticloadbalancing:ModifyLoadBalancerAttributes",
                    "elasticloadbalancing:ModifyRule",
                    "elasticloadbalancing:ModifyTargetGroup",
                    "elasticloadbalancing:ModifyTargetGroupAttributes",
                    "elasticloadbalancing:RegisterTargets",
                    "elasticloadbalancing:RemoveListenerCertificates",
                    "elasticloadbalancing:RemoveTags",
                    "elasticloadbalancing:SetIpAddressType",
                    "elasticloadbalancing:SetSecurityGroups",
                    "elasticloadbalancing:SetSubnets",
                    "elasticloadbalancing:SetWebACL",
                    "iam:CreateServiceLinkedRole",
                    "iam:GetServerCertificate",
                    "iam:ListServerCertificates",
                    "waf-regional:GetWebACLForResource",
                    "waf-regional:GetWebACL",
                    "waf-regional:AssociateWebACL",
                    "waf-regional:DisassociateWebACL",
                    "tag:GetResources",
                    "tag:TagResources",
                    "waf:GetWebACL",
                    "wafv2:GetWebACL",
                    "wafv2:GetWebACLForResource",
                    "wafv2:AssociateWebACL",
                    "wafv2:DisassociateWebACL",
                    "shield:DescribeProtection",
                    "shield:GetSubscriptionState",
                    "shield:DeleteProtection",
                    "shield:CreateProtection",
                    "shield:DescribeSubscription",
                    "shield:ListProtections",
                ],
                &["*"],
            ),
        },
        NodePolicy {
            name: "AppMesh",
            document: statement(
                &[
                    "appmesh:*",
                    "servicediscovery:CreateService",
                    "servicediscovery:GetService",
                    "servicediscovery:RegisterInstance",
                    "servicediscovery:DeregisterInstance",
                    "servicediscovery:ListInstances",
                    "servicediscovery:ListNamespaces",
                    "servicediscovery:ListServices",
                    "route53:GetHealthCheck",
                    "route53:CreateHealthCheck",
                    "route53:UpdateHealthCheck",
                    "route53:ChangeResourceRecordSets",
                    "route53:DeleteHealthCheck",
                ],
                &["*"],
            ),
        },
        NodePolicy {
            name: "CertManagerChangeSet",
            document: statement(
                &["route53:ChangeResourceRecordSets"],
                &["arn:aws:route53:::hostedzone/*"],
            ),
        },
        NodePolicy {
            name: "CertManagerGetChange",
            document: statement(&["route53:GetChange"], &["arn:aws:route53:::change/*"]),
        },
        NodePolicy {
            name: "CertManagerHostedZone",
            document: statement(
                &[
                    "route53:ListHostedZones",
                    "route53:ListResourceRecordSets",
                    "route53:ListHostedZonesByName",
                    "route53:ListTagsForResource",
                ],
                &["*"],
            ),
        },
        NodePolicy {
            name: "Ebs",
            document: statement(
                &[
                    "ec2:AttachVolume",
                    "ec2:CreateSnapshot",
                    "ec2:CreateTags",
                    "ec2:CreateVolume",
                    "ec2:DeleteSnapshot",
                    "ec2:DeleteTags",
                    "ec2:DeleteVolume",
                    "ec2:DescribeAvailabilityZones",
                    "ec2:DescribeInstances",
                    "ec2:DescribeSnapshots",
                    "ec2:DescribeTags",
                    "ec2:DescribeVolumes",
                    "ec2:DescribeVolumesModifications",
                    "ec2:DetachVolume",
                    "ec2:ModifyVolume",
                ],
                &["*"],
            ),
        },
        NodePolicy {
            name: "Efs",
            document: statement(&["elasticfilesystem:*"], &["*"]),
        },
        NodePolicy {
            name: "EfsEc2",
            document: statement(
                &[
                    "ec2:DescribeSubnets",
                    "ec2:CreateNetworkInterface",
                    "ec2:DescribeNetworkInterfaces",
                    "ec2:DeleteNetworkInterface",
                    "ec2:ModifyNetworkInterfaceAttribute",
                    "ec2:DescribeNetworkInterfaceAttribute",
                ],
                &["*"],
            ),
        },
        NodePolicy {
            name: "Fsx",
            document: statement(&["fsx:*"], &["*"]),
        },
        NodePolicy {
            name: "ServiceLinkRole",
            document: statement(
                &[
                    "iam:CreateServiceLinkedRole",
                    "iam:AttachRolePolicy",
                    "iam:PutRolePolicy",
                ],
                &["*"],
            ),
        },
        NodePolicy {
            name: "XRay",
            document: statement(
                &[
                    "xray:PutTraceSegments",
                    "xray:PutTelemetryRecords",
                    "xray:GetSamplingRules",
                    "xray:GetSamplingTargets",
                    "xray:GetSamplingStatisticSummaries",
                ],
                &["*"],
            ),
        },
    ]
}

/// The bundle rendered as an IAM role `Policies` property.
pub fn as_role_policies() -> Json {
    Json::Array(
        node_policies()
            .into_iter()
            .map(|p| {
                json!({
                    "PolicyName": p.name,
                    "PolicyDocument": p.document,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_is_stable() {
        let bundle = node_policies();
        assert_eq!(bundle.len(), 12);
        assert_eq!(bundle[0].name, "Autoscaler4Eks");
        assert_eq!(
            bundle[0].document["Statement"][0]["Effect"],
            "Allow"
        );
    }

    #[test]
    fn test_role_policies_shape() {
        let policies = as_role_policies();
        assert_eq!(policies.as_array().unwrap().len(), 12);
        assert!(policies[1]["PolicyDocument"]["Statement"][0]["Action"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a == "elasticloadbalancing:CreateLoadBalancer"));
    }
}
