//! Routing inbound command messages to copy actions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::errors::CommandError;

pub const COPY_SELECTION: &str = "copy-selection";
pub const COPY_CODE_AT_CARET: &str = "copy-code-at-caret";

/// Message sent by the host's menu and shortcut layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMessage {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_text: Option<String>,
}

impl CommandMessage {
    pub fn new(action: &str) -> Self {
        Self {
            action: Some(action.to_owned()),
            selection_text: None,
        }
    }

    pub fn with_selection(mut self, text: impl Into<String>) -> Self {
        self.selection_text = Some(text.into());
        self
    }
}

/// What a routed command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeAction {
    /// Copy the provided text, else the selection, else the nearest block.
    CopySelection,
    /// Copy the block at the caret or last right-click, ignoring any selection.
    CopyCodeAtCaret,
}

/// A message resolved against the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedCommand {
    pub action: BridgeAction,
    /// Pre-extracted selection text; `None` when absent or empty.
    pub payload: Option<String>,
}

/// Dispatch table keyed by action name.
#[derive(Debug, Clone)]
pub struct CommandBridge {
    handlers: BTreeMap<String, BridgeAction>,
}

impl Default for CommandBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBridge {
    /// A bridge with the built-in actions registered.
    pub fn new() -> Self {
        let mut bridge = Self {
            handlers: BTreeMap::new(),
        };
        bridge.register(COPY_SELECTION, BridgeAction::CopySelection);
        bridge.register(COPY_CODE_AT_CARET, BridgeAction::CopyCodeAtCaret);
        bridge
    }

    /// Register (or re-point) an action name.
    pub fn register(&mut self, name: &str, action: BridgeAction) {
        self.handlers.insert(name.to_owned(), action);
    }

    pub fn actions(&self) -> impl Iterator<Item = (&str, BridgeAction)> {
        self.handlers
            .iter()
            .map(|(name, action)| (name.as_str(), *action))
    }

    pub fn route(&self, message: &CommandMessage) -> Result<RoutedCommand, CommandError> {
        let name = message
            .action
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(CommandError::MissingAction)?;
        let action = self
            .handlers
            .get(name)
            .copied()
            .ok_or_else(|| CommandError::UnknownAction(name.to_owned()))?;
        let payload = message
            .selection_text
            .clone()
            .filter(|text| !text.is_empty());
        Ok(RoutedCommand { action, payload })
    }

    /// Parse and route a raw JSON message.
    pub fn route_json(&self, raw: &str) -> Result<RoutedCommand, CommandError> {
        let message: CommandMessage = serde_json::from_str(raw)?;
        self.route(&message)
    }
}

/// Where a host registration comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostTrigger {
    /// Context-menu entry shown for the given menu context.
    ContextMenu {
        id: &'static str,
        title: &'static str,
        context: &'static str,
    },
    /// Named keyboard command.
    KeyboardCommand { name: &'static str },
}

/// A host-side registration and the action its events turn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBinding {
    pub trigger: HostTrigger,
    pub action: &'static str,
}

const HOST_BINDINGS: &[HostBinding] = &[
    HostBinding {
        trigger: HostTrigger::ContextMenu {
            id: "copy_clean_selection",
            title: "Copy selection (clean)",
            context: "selection",
        },
        action: COPY_SELECTION,
    },
    HostBinding {
        trigger: HostTrigger::KeyboardCommand {
            name: COPY_SELECTION,
        },
        action: COPY_SELECTION,
    },
];

/// Registrations the host layer is expected to make.
pub fn host_bindings() -> &'static [HostBinding] {
    HOST_BINDINGS
}

/// Message for a click on a registered context-menu entry. Menu clicks carry the selection.
pub fn message_for_menu_click(menu_id: &str, selection_text: Option<&str>) -> Option<CommandMessage> {
    HOST_BINDINGS.iter().find_map(|binding| match binding.trigger {
        HostTrigger::ContextMenu { id, .. } if id == menu_id => Some(CommandMessage {
            action: Some(binding.action.to_owned()),
            selection_text: selection_text.map(str::to_owned),
        }),
        _ => None,
    })
}

/// Message for a registered keyboard command. Shortcuts carry no payload.
pub fn message_for_keyboard_command(command: &str) -> Option<CommandMessage> {
    HOST_BINDINGS.iter().find_map(|binding| match binding.trigger {
        HostTrigger::KeyboardCommand { name } if name == command => {
            Some(CommandMessage::new(binding.action))
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_builtin_actions() {
        let bridge = CommandBridge::new();
        let routed = bridge
            .route_json(r#"{"action":"copy-selection","selectionText":"$ ls"}"#)
            .expect("routed");
        assert_eq!(routed.action, BridgeAction::CopySelection);
        assert_eq!(routed.payload.as_deref(), Some("$ ls"));

        let routed = bridge
            .route_json(r#"{"action":"copy-code-at-caret"}"#)
            .expect("routed");
        assert_eq!(routed.action, BridgeAction::CopyCodeAtCaret);
        assert_eq!(routed.payload, None);
    }

    #[test]
    fn empty_selection_text_is_no_payload() {
        let bridge = CommandBridge::new();
        let message = CommandMessage::new(COPY_SELECTION).with_selection("");
        assert_eq!(bridge.route(&message).expect("routed").payload, None);
    }

    #[test]
    fn rejects_unroutable_messages() {
        let bridge = CommandBridge::new();
        assert!(matches!(
            bridge.route_json("not json"),
            Err(CommandError::Malformed(_))
        ));
        assert!(matches!(
            bridge.route_json(r#"{"selectionText":"x"}"#),
            Err(CommandError::MissingAction)
        ));
        assert!(matches!(
            bridge.route_json(r#"{"action":"open-settings"}"#),
            Err(CommandError::UnknownAction(name)) if name == "open-settings"
        ));
    }

    #[test]
    fn extra_actions_can_be_registered() {
        let mut bridge = CommandBridge::new();
        bridge.register("copy-block", BridgeAction::CopyCodeAtCaret);
        let routed = bridge.route(&CommandMessage::new("copy-block")).expect("routed");
        assert_eq!(routed.action, BridgeAction::CopyCodeAtCaret);
        assert_eq!(bridge.actions().count(), 3);
    }

    #[test]
    fn host_events_translate_to_messages() {
        let menu = message_for_menu_click("copy_clean_selection", Some(">>> 1 + 1"))
            .expect("menu entry registered");
        assert_eq!(menu.action.as_deref(), Some(COPY_SELECTION));
        assert_eq!(menu.selection_text.as_deref(), Some(">>> 1 + 1"));
        assert_eq!(message_for_menu_click("other_entry", None), None);

        let shortcut = message_for_keyboard_command(COPY_SELECTION).expect("command registered");
        assert_eq!(shortcut, CommandMessage::new(COPY_SELECTION));
        assert_eq!(message_for_keyboard_command("toggle"), None);
    }

    #[test]
    fn messages_serialize_in_host_shape() {
        let json = serde_json::to_string(&CommandMessage::new(COPY_SELECTION).with_selection("x"))
            .expect("serialize");
        assert_eq!(json, r#"{"action":"copy-selection","selectionText":"x"}"#);
    }
}
