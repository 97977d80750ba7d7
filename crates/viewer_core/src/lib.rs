use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{DocumentId, DocumentNaming, NavControl, PageNumber, ViewerState},
    error::{ContentUnavailable, UnavailableReason},
    protocol::{ViewPhase, ViewerEvent, ViewerSnapshot},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod error;
pub mod render;
pub mod transport;

pub use error::{LoadError, TransportError, ViewerError};
pub use render::{CommonMarkRenderer, MarkdownRenderer, PlainTextRenderer};
pub use transport::{DirectoryTransport, DocumentTransport, FetchedDocument, HttpTransport};

use render::escape_html;

pub const DEFAULT_TOTAL_PAGES: u32 = 17;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How a retrieval that completed with a non-success status is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePolicy {
    /// Any non-2xx status makes the chapter unavailable and nothing is rendered.
    #[default]
    Strict,
    /// Whatever body came back is rendered as chapter content.
    Permissive,
}

impl FromStr for ResponsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(format!(
                "unknown response policy '{other}' (expected 'strict' or 'permissive')"
            )),
        }
    }
}

impl fmt::Display for ResponsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Permissive => f.write_str("permissive"),
        }
    }
}

/// Retrieves a single chapter and converts it into displayable markup.
pub struct ContentFetcher {
    transport: Arc<dyn DocumentTransport>,
    renderer: Arc<dyn MarkdownRenderer>,
    policy: ResponsePolicy,
}

impl ContentFetcher {
    pub fn new(
        transport: Arc<dyn DocumentTransport>,
        renderer: Arc<dyn MarkdownRenderer>,
        policy: ResponsePolicy,
    ) -> Self {
        Self {
            transport,
            renderer,
            policy,
        }
    }

    pub fn with_commonmark(transport: Arc<dyn DocumentTransport>) -> Self {
        Self::new(transport, Arc::new(CommonMarkRenderer), ResponsePolicy::Strict)
    }

    pub fn policy(&self) -> ResponsePolicy {
        self.policy
    }

    pub async fn load(&self, document: &DocumentId) -> Result<String, LoadError> {
        let fetched = self.transport.fetch(document).await?;
        if !fetched.is_success() {
            match self.policy {
                ResponsePolicy::Strict => {
                    return Err(LoadError::Unavailable(UnavailableReason::Status {
                        code: fetched.status,
                    }));
                }
                ResponsePolicy::Permissive => {
                    warn!(
                        "viewer: rendering non-success body document={} status={}",
                        document, fetched.status
                    );
                }
            }
        }
        Ok(self.renderer.render(&fetched.body))
    }
}

/// The anchors of the hosting shell. The viewer mutates them and never owns
/// their lifetime.
pub trait ViewSurface: Send {
    /// Replaces the whole content container.
    fn replace_content(&mut self, markup: &str);
    fn set_page_indicator(&mut self, text: &str);
    fn set_control_enabled(&mut self, control: NavControl, enabled: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub total_pages: u32,
    pub naming: DocumentNaming,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            total_pages: DEFAULT_TOTAL_PAGES,
            naming: DocumentNaming::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Loaded {
        page: PageNumber,
    },
    Unavailable {
        page: PageNumber,
        reason: UnavailableReason,
    },
    Failed {
        page: PageNumber,
        message: String,
    },
    /// A newer request was issued before this one completed.
    Superseded {
        page: PageNumber,
    },
    /// Nothing was requested: boundary no-op or viewer not initialized.
    Ignored,
}

struct ViewerInner<V> {
    state: ViewerState,
    phase: ViewPhase,
    latest_epoch: u64,
    pending: Option<PageNumber>,
    initialized: bool,
    view: V,
}

impl<V: ViewSurface> ViewerInner<V> {
    /// Page that next/previous step from: the in-flight request if it is a
    /// real chapter, otherwise the displayed one.
    fn navigation_base(&self) -> PageNumber {
        self.pending
            .filter(|page| self.state.contains(*page))
            .unwrap_or(self.state.current_page)
    }

    fn apply_navigation(&mut self) {
        let indicator = self.state.indicator();
        let controls = self.state.controls();
        self.view.set_page_indicator(&indicator);
        self.view
            .set_control_enabled(NavControl::Previous, controls.previous_enabled);
        self.view
            .set_control_enabled(NavControl::Next, controls.next_enabled);
    }
}

/// Pagination controller over a fixed, ordered chapter sequence.
pub struct ChapterViewer<V: ViewSurface> {
    fetcher: ContentFetcher,
    naming: DocumentNaming,
    inner: Mutex<ViewerInner<V>>,
    events: broadcast::Sender<ViewerEvent>,
}

impl<V: ViewSurface> ChapterViewer<V> {
    pub fn new(
        config: ViewerConfig,
        fetcher: ContentFetcher,
        view: V,
    ) -> Result<Arc<Self>, ViewerError> {
        let state = ViewerState::new(config.total_pages).ok_or(ViewerError::InvalidTotalPages)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Arc::new(Self {
            fetcher,
            naming: config.naming,
            inner: Mutex::new(ViewerInner {
                state,
                phase: ViewPhase::Idle,
                latest_epoch: 0,
                pending: None,
                initialized: false,
                view,
            }),
            events,
        }))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewerEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> ViewerState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> ViewerSnapshot {
        let guard = self.inner.lock().await;
        ViewerSnapshot {
            state: guard.state,
            phase: guard.phase.clone(),
            latest_epoch: guard.latest_epoch,
        }
    }

    /// Gives the host access to its view surface between navigations.
    pub async fn with_view<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard.view)
    }

    /// Must be called exactly once by the host before any navigation.
    pub async fn initialize(&self) -> Result<NavigationOutcome, ViewerError> {
        {
            let mut guard = self.inner.lock().await;
            if guard.initialized {
                return Err(ViewerError::AlreadyInitialized);
            }
            guard.initialized = true;
            guard.apply_navigation();
            info!(
                "viewer: initialized total_pages={} policy={}",
                guard.state.total_pages,
                self.fetcher.policy()
            );
        }
        Ok(self.navigate(|_| Some(PageNumber::FIRST)).await)
    }

    /// Requests `page` without checking it against the chapter range. An
    /// out-of-range page ends up unavailable rather than displayed.
    pub async fn go_to(&self, page: PageNumber) -> NavigationOutcome {
        self.navigate(|_| Some(page)).await
    }

    pub async fn next(&self) -> NavigationOutcome {
        self.navigate(|inner| {
            let base = inner.navigation_base();
            if base.0 >= inner.state.total_pages {
                debug!("viewer: next ignored at last page page={base}");
                return None;
            }
            Some(PageNumber(base.0 + 1))
        })
        .await
    }

    pub async fn previous(&self) -> NavigationOutcome {
        self.navigate(|inner| {
            let base = inner.navigation_base();
            if base.0 <= 1 {
                debug!("viewer: previous ignored at first page page={base}");
                return None;
            }
            Some(PageNumber(base.0 - 1))
        })
        .await
    }

    async fn navigate(
        &self,
        pick: impl FnOnce(&ViewerInner<V>) -> Option<PageNumber>,
    ) -> NavigationOutcome {
        let (page, epoch, document) = {
            let mut guard = self.inner.lock().await;
            if !guard.initialized {
                warn!("viewer: navigation before initialize ignored");
                return NavigationOutcome::Ignored;
            }
            let Some(page) = pick(&*guard) else {
                return NavigationOutcome::Ignored;
            };
            guard.latest_epoch += 1;
            let epoch = guard.latest_epoch;
            guard.pending = Some(page);
            guard.phase = ViewPhase::Loading { page, epoch };
            (page, epoch, self.naming.document_for(page))
        };

        debug!("viewer: loading page={page} epoch={epoch} document={document}");
        let _ = self
            .events
            .send(ViewerEvent::NavigationRequested { page, epoch });

        let result = self.fetcher.load(&document).await;
        self.complete(page, epoch, result).await
    }

    async fn complete(
        &self,
        page: PageNumber,
        epoch: u64,
        result: Result<String, LoadError>,
    ) -> NavigationOutcome {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if epoch != inner.latest_epoch {
            debug!(
                "viewer: discarding stale completion page={page} epoch={epoch} latest={}",
                inner.latest_epoch
            );
            let _ = self.events.send(ViewerEvent::StaleCompletionDiscarded {
                page,
                epoch,
                latest_epoch: inner.latest_epoch,
            });
            return NavigationOutcome::Superseded { page };
        }
        inner.pending = None;

        let total_pages = inner.state.total_pages;
        match result {
            Ok(markup) if inner.state.contains(page) => {
                inner.view.replace_content(&markup);
                inner.state.current_page = page;
                inner.apply_navigation();
                inner.phase = ViewPhase::Loaded { page };
                info!("viewer: chapter loaded page={page} total_pages={total_pages}");
                let _ = self
                    .events
                    .send(ViewerEvent::ChapterLoaded { page, total_pages });
                NavigationOutcome::Loaded { page }
            }
            Ok(_) => {
                self.mark_unavailable(inner, page, UnavailableReason::OutOfRange { total_pages })
            }
            Err(LoadError::Unavailable(reason)) => self.mark_unavailable(inner, page, reason),
            Err(LoadError::Transport(err)) => {
                let message = err.to_string();
                warn!(
                    "viewer: chapter load failed page={page} displayed={} error={message}",
                    inner.state.current_page
                );
                inner.phase = ViewPhase::Failed {
                    page,
                    message: message.clone(),
                };
                let _ = self.events.send(ViewerEvent::LoadFailed {
                    page,
                    message: message.clone(),
                });
                NavigationOutcome::Failed { page, message }
            }
        }
    }

    fn mark_unavailable(
        &self,
        inner: &mut ViewerInner<V>,
        page: PageNumber,
        reason: UnavailableReason,
    ) -> NavigationOutcome {
        let unavailable = ContentUnavailable::new(page, reason.clone());
        inner.view.replace_content(&unavailable_notice(&unavailable));
        // A missing chapter inside the sequence still takes its slot so
        // next/previous can step past it.
        if inner.state.contains(page) {
            inner.state.current_page = page;
            inner.apply_navigation();
        }
        warn!("viewer: {unavailable} displayed={}", inner.state.current_page);
        inner.phase = ViewPhase::Unavailable {
            page,
            reason: reason.clone(),
        };
        let _ = self.events.send(ViewerEvent::ChapterUnavailable {
            page,
            reason: reason.clone(),
        });
        NavigationOutcome::Unavailable { page, reason }
    }
}

pub fn unavailable_notice(unavailable: &ContentUnavailable) -> String {
    format!(
        "<div class=\"chapter-unavailable\"><p>Chapter {} is unavailable because {}.</p></div>\n",
        unavailable.page,
        escape_html(&unavailable.reason.describe())
    )
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
