//! Drug label lookup with caching, throttling and offline fallback.
//!
//! The label source itself is injected. `LabelClient` never surfaces an
//! error: failures degrade to a stale cached label or an `Unavailable` view,
//! and nothing here feeds back into dose or interaction results.

use crate::config::LabelConfig;
use crate::{Catalog, Drug, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Label sections relevant at the point of care
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LabelInfo {
    pub generic_name: String,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub pregnancy: Option<String>,
    #[serde(default)]
    pub nursing: Option<String>,
    #[serde(default)]
    pub pediatric_use: Option<String>,
    #[serde(default)]
    pub geriatric_use: Option<String>,
    #[serde(default)]
    pub warnings: Option<String>,
    #[serde(default)]
    pub boxed_warning: Option<String>,
    #[serde(default)]
    pub contraindications: Option<String>,
}

/// Fetches label data by generic name
pub trait LabelSource {
    /// `Ok(None)` when the source has no label for the name
    fn fetch(&self, generic_name: &str) -> Result<Option<LabelInfo>>;
}

/// Time source for the cache and throttle
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What the caller can show for a drug's label
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LabelView {
    Available { info: LabelInfo, from_cache: bool },
    /// Expired cache served because the source failed
    Stale { info: LabelInfo, reason: String },
    /// The source has nothing for this drug, with the reason why
    NotAvailable { note: String },
    Unavailable { reason: String },
}

#[derive(Clone, Debug)]
enum CachedLabel {
    Found(LabelInfo),
    Missing(String),
}

#[derive(Clone, Debug)]
struct CacheEntry {
    label: CachedLabel,
    stored_at: Instant,
}

const NO_LABEL_NOTE: &str = "No label data found for this drug.";

pub struct LabelClient<S, C = SystemClock> {
    source: S,
    clock: C,
    ttl: Duration,
    min_interval: Duration,
    cache: HashMap<String, CacheEntry>,
    last_request: Option<Instant>,
}

impl<S: LabelSource> LabelClient<S, SystemClock> {
    pub fn new(source: S, config: &LabelConfig) -> Self {
        Self::with_clock(source, SystemClock, config.cache_ttl(), config.min_interval())
    }
}

impl<S: LabelSource, C: Clock> LabelClient<S, C> {
    pub fn with_clock(source: S, clock: C, ttl: Duration, min_interval: Duration) -> Self {
        Self {
            source,
            clock,
            ttl,
            min_interval,
            cache: HashMap::new(),
            last_request: None,
        }
    }

    /// Look up a catalog drug by id
    pub fn lookup_id(&mut self, catalog: &Catalog, drug_id: &str) -> LabelView {
        match catalog.drug(drug_id) {
            Ok(drug) => self.lookup(drug),
            Err(e) => LabelView::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    pub fn lookup(&mut self, drug: &Drug) -> LabelView {
        let now = self.clock.now();
        if let Some(entry) = self.cache.get(&drug.id) {
            if now.duration_since(entry.stored_at) <= self.ttl {
                return match &entry.label {
                    CachedLabel::Found(info) => LabelView::Available {
                        info: info.clone(),
                        from_cache: true,
                    },
                    CachedLabel::Missing(note) => LabelView::NotAvailable { note: note.clone() },
                };
            }
        }

        let Some(mapping) = &drug.label else {
            return LabelView::Unavailable {
                reason: format!("{} has no label mapping", drug.name),
            };
        };

        if let Some(note) = &mapping.not_approved_note {
            self.store(&drug.id, CachedLabel::Missing(note.clone()));
            return LabelView::NotAvailable { note: note.clone() };
        }

        self.throttle();
        match self.source.fetch(&mapping.generic_name) {
            Ok(Some(mut info)) => {
                if info.brand_name.is_none() {
                    info.brand_name = mapping.brand_names.first().cloned();
                }
                self.store(&drug.id, CachedLabel::Found(info.clone()));
                LabelView::Available {
                    info,
                    from_cache: false,
                }
            }
            Ok(None) => {
                self.store(&drug.id, CachedLabel::Missing(NO_LABEL_NOTE.into()));
                LabelView::NotAvailable {
                    note: NO_LABEL_NOTE.into(),
                }
            }
            Err(e) => {
                tracing::warn!("Label lookup for {} failed: {}", drug.id, e);
                match self.cache.get(&drug.id).map(|entry| &entry.label) {
                    Some(CachedLabel::Found(info)) => LabelView::Stale {
                        info: info.clone(),
                        reason: e.to_string(),
                    },
                    _ => LabelView::Unavailable {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    fn store(&mut self, drug_id: &str, label: CachedLabel) {
        let entry = CacheEntry {
            label,
            stored_at: self.clock.now(),
        };
        self.cache.insert(drug_id.to_string(), entry);
    }

    /// Wait out the minimum interval since the previous request
    fn throttle(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = self.clock.now().duration_since(last);
            if elapsed < self.min_interval {
                self.clock.sleep(self.min_interval - elapsed);
            }
        }
        self.last_request = Some(self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_default_catalog, Error};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone)]
    struct FakeClock {
        start: Instant,
        offset: Rc<Cell<Duration>>,
        slept: Rc<Cell<Duration>>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
                slept: Rc::new(Cell::new(Duration::ZERO)),
            }
        }

        fn advance(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.start + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.slept.set(self.slept.get() + duration);
            self.advance(duration);
        }
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Found,
        Missing,
        Fail,
    }

    #[derive(Clone)]
    struct FakeSource {
        reply: Rc<Cell<Reply>>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl FakeSource {
        fn new(reply: Reply) -> Self {
            Self {
                reply: Rc::new(Cell::new(reply)),
                calls: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl LabelSource for FakeSource {
        fn fetch(&self, generic_name: &str) -> Result<Option<LabelInfo>> {
            self.calls.borrow_mut().push(generic_name.to_string());
            match self.reply.get() {
                Reply::Found => Ok(Some(LabelInfo {
                    generic_name: generic_name.to_string(),
                    warnings: Some("Hypersensitivity reactions.".into()),
                    ..Default::default()
                })),
                Reply::Missing => Ok(None),
                Reply::Fail => Err(Error::Label("connection refused".into())),
            }
        }
    }

    fn client(source: &FakeSource, clock: &FakeClock) -> LabelClient<FakeSource, FakeClock> {
        LabelClient::with_clock(
            source.clone(),
            clock.clone(),
            Duration::from_secs(24 * 3600),
            Duration::from_millis(500),
        )
    }

    #[test]
    fn test_fetch_then_cache_hit() {
        let catalog = build_default_catalog();
        let source = FakeSource::new(Reply::Found);
        let clock = FakeClock::new();
        let mut labels = client(&source, &clock);

        match labels.lookup_id(&catalog, "ceftriaxona") {
            LabelView::Available { info, from_cache } => {
                assert!(!from_cache);
                assert_eq!(info.generic_name, "ceftriaxone");
                assert_eq!(info.brand_name.as_deref(), Some("Rocephin"));
            }
            other => panic!("unexpected view {:?}", other),
        }
        assert!(matches!(
            labels.lookup_id(&catalog, "ceftriaxona"),
            LabelView::Available { from_cache: true, .. }
        ));
        assert_eq!(source.calls.borrow().len(), 1);
    }

    #[test]
    fn test_not_approved_short_circuits() {
        let catalog = build_default_catalog();
        let source = FakeSource::new(Reply::Found);
        let clock = FakeClock::new();
        let mut labels = client(&source, &clock);

        assert!(matches!(
            labels.lookup_id(&catalog, "metamizol"),
            LabelView::NotAvailable { .. }
        ));
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn test_unmapped_and_unknown_drugs() {
        let mut catalog = build_default_catalog();
        if let Some(drug) = catalog.drugs.get_mut("atropina") {
            drug.label = None;
        }
        let source = FakeSource::new(Reply::Found);
        let clock = FakeClock::new();
        let mut labels = client(&source, &clock);

        assert!(matches!(labels.lookup_id(&catalog, "atropina"), LabelView::Unavailable { .. }));
        assert!(matches!(labels.lookup_id(&catalog, "nothing"), LabelView::Unavailable { .. }));
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn test_missing_label_is_cached_as_not_available() {
        let catalog = build_default_catalog();
        let source = FakeSource::new(Reply::Missing);
        let clock = FakeClock::new();
        let mut labels = client(&source, &clock);

        assert!(matches!(labels.lookup_id(&catalog, "tramadol"), LabelView::NotAvailable { .. }));
        assert!(matches!(labels.lookup_id(&catalog, "tramadol"), LabelView::NotAvailable { .. }));
        assert_eq!(source.calls.borrow().len(), 1);
    }

    #[test]
    fn test_failure_without_cache_is_unavailable() {
        let catalog = build_default_catalog();
        let source = FakeSource::new(Reply::Fail);
        let clock = FakeClock::new();
        let mut labels = client(&source, &clock);

        match labels.lookup_id(&catalog, "ketorolaco") {
            LabelView::Unavailable { reason } => assert!(reason.contains("connection refused")),
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_expired_cache_refetches_and_falls_back_to_stale() {
        let catalog = build_default_catalog();
        let source = FakeSource::new(Reply::Found);
        let clock = FakeClock::new();
        let mut labels = client(&source, &clock);

        labels.lookup_id(&catalog, "diclofenac");
        clock.advance(Duration::from_secs(25 * 3600));

        source.reply.set(Reply::Fail);
        assert!(matches!(labels.lookup_id(&catalog, "diclofenac"), LabelView::Stale { .. }));

        source.reply.set(Reply::Found);
        assert!(matches!(
            labels.lookup_id(&catalog, "diclofenac"),
            LabelView::Available { from_cache: false, .. }
        ));
        assert_eq!(source.calls.borrow().len(), 3);
    }

    #[test]
    fn test_requests_are_spaced_by_min_interval() {
        let catalog = build_default_catalog();
        let source = FakeSource::new(Reply::Found);
        let clock = FakeClock::new();
        let mut labels = client(&source, &clock);

        labels.lookup_id(&catalog, "diclofenac");
        clock.advance(Duration::from_millis(200));
        labels.lookup_id(&catalog, "ketorolaco");
        assert_eq!(clock.slept.get(), Duration::from_millis(300));

        // cache hits never wait
        labels.lookup_id(&catalog, "ketorolaco");
        assert_eq!(clock.slept.get(), Duration::from_millis(300));
    }
}
