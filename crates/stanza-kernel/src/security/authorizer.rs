use std::collections::BTreeSet;

use crate::ast::Node;
use crate::interpreter::Context;

/// Gate for `🔒` nodes.
///
/// Called once per locked node, before any of it runs. `Err` carries the
/// reason, which becomes the failure message.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, node: &Node, ctx: &Context) -> Result<(), String>;
}

/// Refuses every locked node. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn authorize(&self, node: &Node, _ctx: &Context) -> Result<(), String> {
        Err(format!("locked: {node} requires authorization"))
    }
}

/// Accepts every locked node.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _node: &Node, _ctx: &Context) -> Result<(), String> {
        Ok(())
    }
}

/// Accepts a locked node when every command inside it is listed.
///
/// Entries match a command's full `namespace.action` key or its name as
/// written (`deploy` for a root command).
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    keys: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allow(&mut self, key: impl Into<String>) {
        self.keys.insert(key.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

impl Authorizer for AllowList {
    fn authorize(&self, node: &Node, _ctx: &Context) -> Result<(), String> {
        let denied: Vec<String> = node
            .commands()
            .into_iter()
            .filter(|cmd| !self.contains(&cmd.key()) && !self.contains(&cmd.display_name()))
            .map(|cmd| cmd.display_name())
            .collect();
        if denied.is_empty() {
            Ok(())
        } else {
            Err(format!("locked: not authorized: {}", denied.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    fn deploy_then_notify() -> Node {
        Node::operation(
            BinaryOp::Then,
            Node::command("ops.deploy", vec!["prod".into()]),
            Node::command("notify", vec![]),
        )
    }

    #[test]
    fn deny_all_names_the_node() {
        let err = DenyAll
            .authorize(&Node::command("ops.deploy", vec![]), &Context::new())
            .expect_err("denied");
        assert!(err.contains("ops.deploy"));
    }

    #[test]
    fn allow_all_accepts() {
        assert!(AllowAll.authorize(&deploy_then_notify(), &Context::new()).is_ok());
    }

    #[test]
    fn allow_list_needs_every_command() {
        let partial = AllowList::new(["ops.deploy"]);
        let err = partial
            .authorize(&deploy_then_notify(), &Context::new())
            .expect_err("notify is not listed");
        assert!(err.contains("notify"));
        assert!(!err.contains("ops.deploy"));

        let full = AllowList::new(["ops.deploy", "notify"]);
        assert!(full.authorize(&deploy_then_notify(), &Context::new()).is_ok());
    }

    #[test]
    fn allow_list_accepts_root_key() {
        let list = AllowList::new(["root.notify"]);
        assert!(list
            .authorize(&Node::command("notify", vec![]), &Context::new())
            .is_ok());
    }
}
