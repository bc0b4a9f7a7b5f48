use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, TryRecvError};
use tracing::{debug, warn};

use crate::{FontDescriptor, FontError, FontFetch, LoadedFont};

type SlotResult = (usize, Result<LoadedFont, FontError>);

/// Outcome of polling a [`FontJoin`].
#[derive(Debug, Clone)]
pub enum JoinStatus {
    /// At least one resource has not resolved yet.
    Pending,
    /// Every resource resolved; fonts are in descriptor order.
    Ready(Vec<LoadedFont>),
    /// A resource failed or the deadline passed. Terminal.
    Failed(FontError),
}

/// Waits for N independent font loads and resolves once all of them finish.
///
/// Each descriptor is fetched on its own worker thread. Results arrive over a
/// channel and are collected by [`FontJoin::poll`], which never blocks, so a
/// frame loop can check progress once per tick. Dropping the join closes the
/// channel; workers that finish afterwards discard their result.
pub struct FontJoin {
    families: Vec<String>,
    receiver: Receiver<SlotResult>,
    slots: Vec<Option<LoadedFont>>,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
    outcome: Option<Result<Vec<LoadedFont>, FontError>>,
}

impl FontJoin {
    /// Starts loading every descriptor in parallel.
    pub fn spawn(
        descriptors: Vec<FontDescriptor>,
        fetcher: Arc<dyn FontFetch>,
        timeout: Option<Duration>,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let families = descriptors
            .iter()
            .map(|descriptor| descriptor.family.clone())
            .collect::<Vec<_>>();

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            let worker_sender = sender.clone();
            let fetcher = Arc::clone(&fetcher);
            let family = descriptor.family.clone();
            let spawned = thread::Builder::new()
                .name(format!("font-load-{index}"))
                .spawn(move || {
                    let result = fetcher.fetch(&descriptor);
                    if worker_sender.send((index, result)).is_err() {
                        debug!(family = %descriptor.family, "font join dropped before load finished");
                    }
                });
            if let Err(err) = spawned {
                warn!(%family, error = %err, "failed to spawn font worker");
                let _ = sender.send((index, Err(FontError::Disconnected { family })));
            }
        }

        let slots = vec![None; families.len()];
        Self {
            families,
            receiver,
            slots,
            deadline: timeout.map(|timeout| Instant::now() + timeout),
            timeout,
            outcome: None,
        }
    }

    /// A join whose fonts are already available.
    pub fn resolved(fonts: Vec<LoadedFont>) -> Self {
        let (_sender, receiver) = unbounded();
        Self {
            families: fonts.iter().map(|font| font.family().to_string()).collect(),
            receiver,
            slots: Vec::new(),
            deadline: None,
            timeout: None,
            outcome: Some(Ok(fonts)),
        }
    }

    pub fn families(&self) -> &[String] {
        &self.families
    }

    /// Collects finished loads without blocking.
    pub fn poll(&mut self, now: Instant) -> JoinStatus {
        if self.outcome.is_none() {
            self.drain();
        }
        if self.outcome.is_none() {
            if let Some(deadline) = self.deadline {
                if now >= deadline {
                    self.outcome = Some(Err(self.timeout_error()));
                }
            }
        }
        self.status()
    }

    /// Blocks until every load resolves, a load fails, or `limit` elapses.
    pub fn wait(&mut self, limit: Duration) -> JoinStatus {
        let give_up = Instant::now() + limit;
        let give_up = match self.deadline {
            Some(deadline) if deadline < give_up => deadline,
            _ => give_up,
        };
        while self.outcome.is_none() {
            let now = Instant::now();
            if now >= give_up {
                self.outcome = Some(Err(self.timeout_error()));
                break;
            }
            match self.receiver.recv_timeout(give_up - now) {
                Ok(slot) => self.accept(slot),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.disconnected(),
            }
        }
        self.status()
    }

    fn drain(&mut self) {
        while self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(slot) => self.accept(slot),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected();
                    break;
                }
            }
        }
    }

    fn accept(&mut self, (index, result): SlotResult) {
        match result {
            Ok(font) => {
                debug!(family = font.family(), "font resource resolved");
                if let Some(slot) = self.slots.get_mut(index) {
                    *slot = Some(font);
                }
                if self.slots.iter().all(Option::is_some) {
                    let fonts = self.slots.iter_mut().filter_map(Option::take).collect();
                    self.outcome = Some(Ok(fonts));
                }
            }
            Err(err) => self.outcome = Some(Err(err)),
        }
    }

    fn disconnected(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let missing = self
            .slots
            .iter()
            .position(Option::is_none)
            .and_then(|index| self.families.get(index))
            .cloned()
            .unwrap_or_default();
        self.outcome = Some(Err(FontError::Disconnected { family: missing }));
    }

    fn timeout_error(&self) -> FontError {
        FontError::Timeout {
            seconds: self.timeout.map(|t| t.as_secs_f32()).unwrap_or_default(),
        }
    }

    fn status(&self) -> JoinStatus {
        match &self.outcome {
            None => JoinStatus::Pending,
            Some(Ok(fonts)) => JoinStatus::Ready(fonts.clone()),
            Some(Err(err)) => JoinStatus::Failed(err.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FontSource;
    use crossbeam_channel::{bounded, Sender};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Fetcher whose loads complete only when the test releases them.
    struct GatedFetcher {
        gates: Mutex<HashMap<String, Receiver<Result<Vec<u8>, FontError>>>>,
    }

    impl GatedFetcher {
        fn new(families: &[&str]) -> (Arc<Self>, HashMap<String, Sender<Result<Vec<u8>, FontError>>>) {
            let mut gates = HashMap::new();
            let mut releases = HashMap::new();
            for family in families {
                let (tx, rx) = bounded(1);
                gates.insert(family.to_string(), rx);
                releases.insert(family.to_string(), tx);
            }
            (
                Arc::new(Self {
                    gates: Mutex::new(gates),
                }),
                releases,
            )
        }
    }

    impl FontFetch for GatedFetcher {
        fn fetch(&self, descriptor: &FontDescriptor) -> Result<LoadedFont, FontError> {
            let gate = self
                .gates
                .lock()
                .unwrap()
                .remove(&descriptor.family)
                .expect("gate for family");
            let bytes = gate.recv().expect("release")?;
            Ok(LoadedFont::new(descriptor.family.clone(), bytes))
        }
    }

    fn descriptor(family: &str) -> FontDescriptor {
        FontDescriptor::new(family, FontSource::Path(PathBuf::from(format!("{family}.ttf"))))
    }

    #[test]
    fn resolves_only_after_every_resource() {
        let (fetcher, releases) = GatedFetcher::new(&["Title", "Subtitle"]);
        let mut join = FontJoin::spawn(
            vec![descriptor("Title"), descriptor("Subtitle")],
            fetcher,
            None,
        );
        assert!(matches!(join.poll(Instant::now()), JoinStatus::Pending));

        releases["Subtitle"].send(Ok(vec![2])).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(matches!(join.poll(Instant::now()), JoinStatus::Pending));

        releases["Title"].send(Ok(vec![1])).unwrap();
        match join.wait(Duration::from_secs(5)) {
            JoinStatus::Ready(fonts) => {
                let families: Vec<_> = fonts.iter().map(|f| f.family().to_string()).collect();
                assert_eq!(families, vec!["Title", "Subtitle"]);
            }
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[test]
    fn single_failure_fails_the_join() {
        let (fetcher, releases) = GatedFetcher::new(&["A", "B"]);
        let mut join = FontJoin::spawn(vec![descriptor("A"), descriptor("B")], fetcher, None);
        releases["A"]
            .send(Err(FontError::NotCached { family: "A".into() }))
            .unwrap();
        assert!(matches!(
            join.wait(Duration::from_secs(5)),
            JoinStatus::Failed(FontError::NotCached { .. })
        ));
        releases["B"].send(Ok(vec![0])).unwrap();
        assert!(matches!(join.poll(Instant::now()), JoinStatus::Failed(_)));
    }

    #[test]
    fn deadline_turns_pending_into_timeout() {
        let (fetcher, _releases) = GatedFetcher::new(&["Slow"]);
        let mut join = FontJoin::spawn(
            vec![descriptor("Slow")],
            fetcher,
            Some(Duration::from_millis(10)),
        );
        let later = Instant::now() + Duration::from_secs(1);
        assert!(matches!(
            join.poll(later),
            JoinStatus::Failed(FontError::Timeout { .. })
        ));
    }

    #[test]
    fn resolved_join_is_ready_immediately() {
        let mut join = FontJoin::resolved(vec![LoadedFont::new("X", vec![1])]);
        assert_eq!(join.families(), ["X".to_string()]);
        assert!(matches!(join.poll(Instant::now()), JoinStatus::Ready(fonts) if fonts.len() == 1));
    }
}
