use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one assistant turn as seen from this side of the connection.
/// `Done` and `Cancelled` are terminal: the response leaves the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Created,
    Streaming,
    Done,
    Cancelled,
}

/// Responses the endpoint is still producing, keyed by their endpoint-assigned id.
#[derive(Debug, Default)]
pub struct ActiveResponses {
    responses: BTreeMap<String, ResponseStatus>,
    last_finished: Option<(String, ResponseStatus)>,
}

impl ActiveResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `id`. A response already streaming never moves back to `Created`.
    pub fn register(&mut self, id: &str, status: ResponseStatus) {
        let entry = self.responses.entry(id.to_string()).or_insert(status);
        if status == ResponseStatus::Streaming {
            *entry = status;
        }
    }

    /// Stops tracking `id` and records how it ended. Returns the status it had
    /// while active, or `None` if it was not tracked.
    pub fn finish(&mut self, id: &str, outcome: ResponseStatus) -> Option<ResponseStatus> {
        let previous = self.responses.remove(id)?;
        self.last_finished = Some((id.to_string(), outcome));
        Some(previous)
    }

    /// Marks every tracked response cancelled and empties the set.
    pub fn cancel_all(&mut self) -> Vec<String> {
        let ids = self.ids();
        for id in &ids {
            self.finish(id, ResponseStatus::Cancelled);
        }
        ids
    }

    /// The most recent response to leave the set, with its terminal status.
    pub fn last_finished(&self) -> Option<(&str, ResponseStatus)> {
        self.last_finished.as_ref().map(|(id, status)| (id.as_str(), *status))
    }

    pub fn status(&self, id: &str) -> Option<ResponseStatus> {
        self.responses.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.responses.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.responses.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Forgets everything, including the last terminal status.
    pub fn clear(&mut self) {
        self.responses.clear();
        self.last_finished = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_is_not_downgraded() {
        let mut responses = ActiveResponses::new();
        responses.register("r1", ResponseStatus::Streaming);
        responses.register("r1", ResponseStatus::Created);
        assert_eq!(responses.status("r1"), Some(ResponseStatus::Streaming));

        responses.register("r2", ResponseStatus::Created);
        responses.register("r2", ResponseStatus::Streaming);
        assert_eq!(responses.status("r2"), Some(ResponseStatus::Streaming));
        assert_eq!(responses.ids(), vec!["r1".to_string(), "r2".to_string()]);

        assert_eq!(responses.finish("r1", ResponseStatus::Done), Some(ResponseStatus::Streaming));
        assert_eq!(responses.finish("r1", ResponseStatus::Done), None);
        assert_eq!(responses.len(), 1);
    }

    #[test]
    fn terminal_status_is_recorded_when_a_response_leaves() {
        let mut responses = ActiveResponses::new();
        assert_eq!(responses.last_finished(), None);

        responses.register("r1", ResponseStatus::Created);
        responses.finish("r1", ResponseStatus::Done);
        assert_eq!(responses.last_finished(), Some(("r1", ResponseStatus::Done)));

        // Untracked ids leave the record alone.
        responses.finish("ghost", ResponseStatus::Cancelled);
        assert_eq!(responses.last_finished(), Some(("r1", ResponseStatus::Done)));

        responses.register("r2", ResponseStatus::Streaming);
        responses.register("r3", ResponseStatus::Created);
        assert_eq!(responses.cancel_all(), vec!["r2".to_string(), "r3".to_string()]);
        assert!(responses.is_empty());
        assert_eq!(responses.last_finished(), Some(("r3", ResponseStatus::Cancelled)));

        responses.clear();
        assert_eq!(responses.last_finished(), None);
    }
}
