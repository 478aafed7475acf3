//! Chat command responder
//!
//! Replies to `!`-prefixed friend messages. Plain chat text gets no reply.
//! Prices are read from the shared store; nothing here touches the network.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use crate::common::traits::MessageHandler;
use crate::common::types::display_item_name;
use crate::config::types::{ChatConfig, ItemsConfig};
use crate::pricing::currency::to_denominations;
use crate::pricing::store::PriceStore;
use crate::trading::policy::TrustedPartners;
use crate::trading::poller::TradePoller;

const HELP_TEXT: &str = "Available commands: !price <item>, !buy <item>, !sell <item>, !owner, !status, !help";
const OPERATOR_HELP_TEXT: &str = "Operator commands: !trusted on|off|status";

pub struct CommandService {
    store: Arc<PriceStore>,
    items: ItemsConfig,
    chat: ChatConfig,
    trusted: Arc<TrustedPartners>,
    poller: Option<Arc<TradePoller>>,
}

impl CommandService {
    pub fn new(store: Arc<PriceStore>, items: ItemsConfig, chat: ChatConfig, trusted: Arc<TrustedPartners>) -> Self {
        Self {
            store,
            items,
            chat,
            trusted,
            poller: None,
        }
    }

    /// Include trade loop counters in `!status`
    pub fn with_poller(mut self, poller: Arc<TradePoller>) -> Self {
        self.poller = Some(poller);
        self
    }

    fn is_operator(&self, sender: &str) -> bool {
        self.chat.operators.iter().any(|op| op == sender)
    }

    /// Route one command line to its handler
    pub fn handle_command(&self, sender: &str, input: &str) -> String {
        let input = input.trim();
        let (command, argument) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command.to_lowercase().as_str() {
            "!price" | "!prices" => self.price(argument),
            "!buy" => self.buy(argument),
            "!sell" => self.sell(argument),
            "!owner" => self.owner(),
            "!status" => self.status(),
            "!help" => self.help(sender),
            "!trusted" if self.is_operator(sender) => self.trusted(argument),
            "!trusted" => "That command is for operators only.".to_string(),
            _ => "Unknown command. Type !help for more info.".to_string(),
        }
    }

    fn price(&self, item: &str) -> String {
        if item.is_empty() {
            return "Usage: !price <item name>".to_string();
        }
        let Some(entry) = self.store.try_get_entry(item) else {
            return "I don't trade that item right now.".to_string();
        };
        format!(
            "{} - BUY: {} | SELL: {} (updated {})",
            display_item_name(item),
            format_side(entry.estimate.buy()),
            format_side(entry.estimate.sell()),
            entry.updated_at.format("%H:%M UTC")
        )
    }

    /// What we pay the partner for their item
    fn buy(&self, item: &str) -> String {
        if item.is_empty() {
            return "Please provide the item name. Example: !buy Team Captain".to_string();
        }
        let name = display_item_name(item);
        if self.items.buy_entry(item).is_none() {
            return format!("I'm not buying {} right now.", name);
        }
        match self.store.try_get_price(item).and_then(|p| p.buy()) {
            Some(value) => format!(
                "I buy {} for {}. Send me a trade offer with the item and I will pay that.",
                name,
                self.describe_value(value)
            ),
            None => format!("No price found for {} yet. Please try again later.", name),
        }
    }

    /// What the partner pays us for our item
    fn sell(&self, item: &str) -> String {
        if item.is_empty() {
            return "Please provide the item name. Example: !sell Team Captain".to_string();
        }
        let name = display_item_name(item);
        let Some(entry) = self.items.sell_entry(item) else {
            return format!("I'm not selling {} right now.", name);
        };
        match self.store.try_get_price(item).and_then(|p| p.sell()) {
            Some(value) => {
                let value = value.max(entry.min_sell_price.unwrap_or(Decimal::ZERO));
                format!(
                    "I sell {} for {}. Send me a trade offer with the payment.",
                    name,
                    self.describe_value(value)
                )
            }
            None => format!("No price found for {} yet. Please try again later.", name),
        }
    }

    fn owner(&self) -> String {
        match &self.chat.owner_profile_url {
            Some(url) => format!("Bot owner profile: {}", url),
            None => "No owner profile is configured.".to_string(),
        }
    }

    fn status(&self) -> String {
        let last = self
            .store
            .last_updated()
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        let mut reply = format!(
            "Bot is online. {} prices tracked, last update {}.",
            self.store.len(),
            last
        );
        if let Some(poller) = &self.poller {
            reply.push_str(&format!(" Trade polls run: {}.", poller.polls_executed()));
        }
        reply
    }

    fn help(&self, sender: &str) -> String {
        if self.is_operator(sender) {
            format!("{}. {}", HELP_TEXT, OPERATOR_HELP_TEXT)
        } else {
            HELP_TEXT.to_string()
        }
    }

    fn trusted(&self, argument: &str) -> String {
        match argument.to_lowercase().as_str() {
            "on" => {
                self.trusted.set_enabled(true);
                info!("Trusted auto-accept enabled from chat");
                "Trusted auto-accept is now ON.".to_string()
            }
            "off" => {
                self.trusted.set_enabled(false);
                info!("Trusted auto-accept disabled from chat");
                "Trusted auto-accept is now OFF.".to_string()
            }
            "" | "status" => format!(
                "Trusted auto-accept is {} ({} trusted partners).",
                if self.trusted.is_enabled() { "ON" } else { "OFF" },
                self.trusted.len()
            ),
            _ => "Usage: !trusted on|off|status".to_string(),
        }
    }

    fn describe_value(&self, value: Decimal) -> String {
        let key_price = self.store.key_price().unwrap_or(Decimal::ZERO);
        format!("{} ({:.2} ref)", to_denominations(value, key_price), value)
    }
}

fn format_side(value: Option<Decimal>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}

impl MessageHandler for CommandService {
    fn on_friend_message(&self, sender: &str, text: &str) -> Option<String> {
        if !text.trim_start().starts_with('!') {
            return None;
        }
        debug!(sender, command = text.trim(), "Chat command");
        Some(self.handle_command(sender, text))
    }

    fn welcome_message(&self) -> String {
        "Hello! This is an automated trading bot. Type !help to see available commands. \
         Please note: all trades are final."
            .to_string()
    }
}
