use claudix_protocol::WireMessage;

/// The single outbound seam. Implementations own framing and connection
/// management; the core treats `send` as fire-and-forget.
pub trait Transport: Send + Sync {
    fn send(&self, message: WireMessage);
}
