use std::sync::mpsc::{self, Receiver, Sender};

/// 將「某路徑的註解已變更」廣播給所有訂閱者。 /
/// Fans the "annotation at this path changed" signal out to subscribers.
///
/// The service layer only emits after a successful save, so subscribers never
/// observe a change that did not reach disk.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Vec<Sender<String>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 訂閱變更事件；回傳接收端。 / Registers a subscriber and returns its receiving end.
    pub fn subscribe(&mut self) -> Receiver<String> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// 送出變更路徑給所有仍存活的訂閱者。 / Sends the changed path to every live subscriber.
    pub fn emit(&mut self, path: &str) {
        self.subscribers
            .retain(|subscriber| subscriber.send(path.to_string()).is_ok());
    }

    /// 目前仍存活的訂閱者數量。 / Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
