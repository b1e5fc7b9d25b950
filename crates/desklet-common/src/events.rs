use tokio::sync::broadcast;

/// Fan-out channel for outward change notifications.
///
/// Publishing never blocks and never fails; with no subscribers the event
/// is dropped and `publish` returns 0.
pub struct EventBus<E: Clone> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: E) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        A,
        B(u32),
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(Ping::A);

        let event = rx.recv().await.unwrap();
        assert_eq!(event, Ping::A);
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Ping::B(7));

        assert_eq!(rx1.recv().await.unwrap(), Ping::B(7));
        assert_eq!(rx2.recv().await.unwrap(), Ping::B(7));
    }

    #[test]
    fn publish_returns_zero_with_no_subscribers() {
        let bus: EventBus<Ping> = EventBus::new(16);
        assert_eq!(bus.publish(Ping::A), 0);
    }

    #[tokio::test]
    async fn publish_returns_subscriber_count() {
        let bus = EventBus::new(16);
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.publish(Ping::A), 2);
    }
}
