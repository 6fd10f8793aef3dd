use serde::{Deserialize, Serialize};

use crate::domain::callgraph::{CallNode, EntryForest};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForestDto {
    pub http: Vec<NodeDto>,
    pub rpc: Vec<NodeDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDto {
    pub signature: String,
    pub class_name: String,
    pub method_name: String,
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_methods: Vec<String>,
    #[serde(default)]
    pub children: Vec<NodeDto>,
}

impl From<&CallNode> for NodeDto {
    fn from(node: &CallNode) -> Self {
        NodeDto {
            signature: node.signature.clone(),
            class_name: node.class_name.clone(),
            method_name: node.method_name.clone(),
            parameters: node.parameters.clone(),
            is_abstract: node.is_abstract,
            mapping_path: node.mapping_path.clone(),
            request_methods: node.request_methods.clone(),
            children: node.children.iter().map(NodeDto::from).collect(),
        }
    }
}

impl From<&EntryForest> for ForestDto {
    fn from(forest: &EntryForest) -> Self {
        ForestDto {
            http: forest.http.iter().map(NodeDto::from).collect(),
            rpc: forest.rpc.iter().map(NodeDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(signature: &str, children: Vec<CallNode>) -> CallNode {
        let (class_name, rest) = signature.split_once('#').unwrap();
        CallNode {
            signature: signature.to_string(),
            class_name: class_name.to_string(),
            method_name: rest.split('(').next().unwrap().to_string(),
            parameters: vec![],
            is_abstract: false,
            mapping_path: None,
            request_methods: vec![],
            children,
        }
    }

    #[test]
    fn test_forest_to_dto() {
        let mut root = node("a/Web#list()", vec![node("a/Repo#all()", vec![])]);
        root.mapping_path = Some("/users/all".to_string());
        root.request_methods = vec!["GET".to_string()];
        let forest = EntryForest {
            http: vec![root],
            rpc: vec![],
        };

        let dto = ForestDto::from(&forest);
        assert_eq!(dto.http[0].children[0].signature, "a/Repo#all()");

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["http"][0]["mapping_path"], "/users/all");
        assert!(json["http"][0]["children"][0].get("mapping_path").is_none());
        assert!(json["http"][0].get("is_abstract").is_none());

        let back: ForestDto = serde_json::from_value(json).unwrap();
        assert_eq!(back, dto);
    }
}
