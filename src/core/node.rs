use serde::{Deserialize, Serialize};

/// Element of a semi-structured feed document.
///
/// Text is stored trimmed. Paths are `/`-separated child names relative to
/// the node, e.g. `"Customer/VatCode"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedNode {
    pub name: String,
    pub text: String,
    pub children: Vec<FeedNode>,
}

impl FeedNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Leaf element carrying `text`.
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into().trim().to_string(),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: FeedNode) -> Self {
        self.children.push(child);
        self
    }

    /// First descendant at `path`.
    pub fn find(&self, path: &str) -> Option<&FeedNode> {
        path.split('/')
            .filter(|step| !step.is_empty())
            .try_fold(self, |node, step| {
                node.children.iter().find(|c| c.name == step)
            })
    }

    /// All descendants at `path`; every step may fan out.
    pub fn find_all(&self, path: &str) -> Vec<&FeedNode> {
        let mut current = vec![self];
        for step in path.split('/').filter(|step| !step.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(|c| c.name == step))
                .collect();
        }
        current
    }

    /// Text at `path`, empty when the element is absent.
    pub fn text_at(&self, path: &str) -> &str {
        self.find(path).map(|n| n.text.as_str()).unwrap_or("")
    }
}
