/// Kind of an outbound message, used by shells to style error bubbles
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Normal,
    Error,
}

/// Where the engine emits outbound text. Implementations render or record
/// messages and never mutate engine state.
pub trait MessageSink: Send + Sync {
    fn post(&self, text: &str, from_user: bool, kind: MessageKind);

    /// Presentation hook fired by a transcript-clearing reset. The default
    /// does nothing; shells that keep a visible transcript clear it here.
    fn clear_transcript(&self) {}
}
