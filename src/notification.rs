use std::collections::HashMap;
use std::time::Duration;

use crate::hints::Hint;

/// How long the server should keep a notification on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Stay until dismissed or closed by id. Sent as `0`.
    Never,
    /// Leave it to the server's settings. Sent as `-1`.
    #[default]
    ServerDefault,
    /// Close after the given time, truncated to whole milliseconds.
    After(Duration),
}

impl Expiration {
    /// The `expire_timeout` argument of `Notify`, saturating at `i32::MAX`.
    pub fn as_millis(&self) -> i32 {
        match self {
            Expiration::Never => 0,
            Expiration::ServerDefault => -1,
            Expiration::After(duration) => i32::try_from(duration.as_millis()).unwrap_or(i32::MAX),
        }
    }
}

impl From<Duration> for Expiration {
    fn from(duration: Duration) -> Self {
        Expiration::After(duration)
    }
}

/// A user-selectable action: `key` comes back in `ActionInvoked`, `label` is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub key: String,
    pub label: String,
}

impl Action {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// Everything sent with one `Notify` call.
///
/// `actions` is kept in the wire form: even elements are action keys, odd
/// elements their labels. A list of odd length is rejected when encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notification {
    pub app_name: String,
    /// Id of a notification to replace in place, or `0` for a new one.
    pub replaces_id: u32,
    /// Icon name from the icon naming spec, or a `file://` URI. May be empty.
    pub app_icon: String,
    pub summary: String,
    pub body: String,
    pub actions: Vec<String>,
    pub hints: HashMap<String, Hint>,
    pub expire_timeout: Expiration,
}

impl Notification {
    pub fn builder() -> NotificationBuilder {
        NotificationBuilder::new()
    }

    /// Appends a `(key, label)` pair to the action list.
    pub fn action(&mut self, key: &str, label: &str) -> &mut Self {
        self.actions.push(key.to_owned());
        self.actions.push(label.to_owned());
        self
    }

    pub fn hint(&mut self, name: &str, value: impl Into<Hint>) -> &mut Self {
        self.hints.insert(name.to_owned(), value.into());
        self
    }

    /// Iterates complete action pairs. A trailing unpaired key is skipped.
    pub fn action_pairs(&self) -> impl Iterator<Item = Action> + '_ {
        self.actions
            .chunks_exact(2)
            .map(|pair| Action::new(&pair[0], &pair[1]))
    }
}

#[derive(Default, Clone)]
pub struct NotificationBuilder {
    app_name: Option<String>,
    replaces_id: Option<u32>,
    app_icon: Option<String>,
    summary: Option<String>,
    body: Option<String>,
    actions: Vec<String>,
    hints: HashMap<String, Hint>,
    expire_timeout: Option<Expiration>,
}

impl NotificationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_owned());
        self
    }

    pub fn replaces_id(mut self, replaces_id: u32) -> Self {
        self.replaces_id = Some(replaces_id);
        self
    }

    pub fn app_icon(mut self, app_icon: &str) -> Self {
        self.app_icon = Some(app_icon.to_owned());
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_owned());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_owned());
        self
    }

    pub fn action(mut self, key: &str, label: &str) -> Self {
        self.actions.push(key.to_owned());
        self.actions.push(label.to_owned());
        self
    }

    pub fn actions(mut self, actions: Vec<(&str, &str)>) -> Self {
        // Flatten the pairs; even elements are identifiers, odd elements are
        // localized names
        self.actions = actions
            .into_iter()
            .flat_map(|(key, label)| [key.to_owned(), label.to_owned()])
            .collect();
        self
    }

    /// Sets the action list in its flat wire form. Odd-length input is
    /// accepted here and rejected when the notification is sent.
    pub fn raw_actions(mut self, actions: Vec<String>) -> Self {
        self.actions = actions;
        self
    }

    pub fn hint(mut self, name: &str, value: impl Into<Hint>) -> Self {
        self.hints.insert(name.to_owned(), value.into());
        self
    }

    pub fn hints<I, K>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (K, Hint)>,
        K: Into<String>,
    {
        self.hints.extend(hints.into_iter().map(|(name, value)| (name.into(), value)));
        self
    }

    pub fn expire_timeout(mut self, expire_timeout: impl Into<Expiration>) -> Self {
        self.expire_timeout = Some(expire_timeout.into());
        self
    }

    pub fn build(self) -> Notification {
        let NotificationBuilder {
            app_name,
            replaces_id,
            app_icon,
            summary,
            body,
            actions,
            hints,
            expire_timeout,
        } = self;

        Notification {
            app_name: app_name.unwrap_or_default(),
            replaces_id: replaces_id.unwrap_or(0),
            app_icon: app_icon.unwrap_or_default(),
            summary: summary.unwrap_or_default(),
            body: body.unwrap_or_default(),
            actions,
            hints,
            expire_timeout: expire_timeout.unwrap_or_default(),
        }
    }
}
