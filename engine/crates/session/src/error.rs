#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("outbound queue full ({capacity} packets)")]
    QueueFull { capacity: usize },

    #[error("connection closed")]
    Closed,
}
