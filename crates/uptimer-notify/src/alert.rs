//! Alert message rendering.

use std::fmt;

/// Direction of a confirmed status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// The target became reachable again.
    Recovered,
    /// The target stopped responding.
    Outage,
}

/// A notification about one confirmed transition of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub url: String,
    /// User or role to mention at the top of the message.
    pub mention: Option<String>,
}

impl Alert {
    pub fn new(kind: AlertKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            mention: None,
        }
    }

    pub fn with_mention(mut self, mention: Option<&str>) -> Self {
        self.mention = mention.map(str::to_string);
        self
    }

    /// The message text, markdown-formatted for chat clients.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref id) = self.mention {
            write!(f, "<@{id}> ")?;
        }
        match self.kind {
            AlertKind::Recovered => write!(
                f,
                "🟢 **Service restored**\nThe site **{}** is reachable again!",
                self.url
            ),
            AlertKind::Outage => write!(
                f,
                "🔴 **Service outage**\nThe site **{}** is unreachable, please check the server.",
                self.url
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outage_message() {
        let text = Alert::new(AlertKind::Outage, "https://oop.example.uk/").render();
        assert!(text.starts_with("🔴 **Service outage**\n"));
        assert!(text.contains("**https://oop.example.uk/**"));
    }

    #[test]
    fn recovery_message() {
        let text = Alert::new(AlertKind::Recovered, "https://oop.example.uk/").render();
        assert!(text.starts_with("🟢 **Service restored**\n"));
        assert!(text.contains("reachable again"));
    }

    #[test]
    fn mention_is_prefixed() {
        let text = Alert::new(AlertKind::Outage, "https://a.example")
            .with_mention(Some("1234"))
            .render();
        assert!(text.starts_with("<@1234> 🔴"));
    }
}
