use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! index_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

index_newtype!(PageNumber);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);
}

/// Name of a chapter resource as understood by a transport, e.g. `PART_3.md`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positional mapping from a page number to its document name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNaming {
    pub prefix: String,
    pub extension: String,
}

impl Default for DocumentNaming {
    fn default() -> Self {
        Self {
            prefix: "PART_".into(),
            extension: ".md".into(),
        }
    }
}

impl DocumentNaming {
    pub fn document_for(&self, page: PageNumber) -> DocumentId {
        DocumentId(format!("{}{}{}", self.prefix, page.0, self.extension))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavControl {
    Previous,
    Next,
}

/// Displayed page and chapter count. `total_pages` never changes after
/// construction and `1 <= current_page <= total_pages` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerState {
    pub current_page: PageNumber,
    pub total_pages: u32,
}

impl ViewerState {
    pub fn new(total_pages: u32) -> Option<Self> {
        if total_pages == 0 {
            return None;
        }
        Some(Self {
            current_page: PageNumber::FIRST,
            total_pages,
        })
    }

    pub fn contains(&self, page: PageNumber) -> bool {
        (1..=self.total_pages).contains(&page.0)
    }

    pub fn is_first(&self) -> bool {
        self.current_page.0 == 1
    }

    pub fn is_last(&self) -> bool {
        self.current_page.0 == self.total_pages
    }

    pub fn controls(&self) -> NavigationControls {
        NavigationControls {
            previous_enabled: !self.is_first(),
            next_enabled: !self.is_last(),
        }
    }

    pub fn indicator(&self) -> String {
        format_page_indicator(self.current_page, self.total_pages)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationControls {
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

impl NavigationControls {
    pub fn is_enabled(&self, control: NavControl) -> bool {
        match control {
            NavControl::Previous => self.previous_enabled,
            NavControl::Next => self.next_enabled,
        }
    }
}

pub fn format_page_indicator(page: PageNumber, total_pages: u32) -> String {
    format!("page {} of {}", page.0, total_pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_naming_matches_part_convention() {
        let naming = DocumentNaming::default();
        assert_eq!(naming.document_for(PageNumber(7)).as_str(), "PART_7.md");
    }

    #[test]
    fn zero_total_pages_is_rejected() {
        assert!(ViewerState::new(0).is_none());
    }

    #[test]
    fn controls_follow_position() {
        let mut state = ViewerState::new(17).expect("state");
        assert_eq!(
            state.controls(),
            NavigationControls {
                previous_enabled: false,
                next_enabled: true
            }
        );

        state.current_page = PageNumber(17);
        assert_eq!(
            state.controls(),
            NavigationControls {
                previous_enabled: true,
                next_enabled: false
            }
        );
        assert_eq!(state.indicator(), "page 17 of 17");
    }

    #[test]
    fn single_page_disables_both_controls() {
        let state = ViewerState::new(1).expect("state");
        assert!(!state.controls().is_enabled(NavControl::Previous));
        assert!(!state.controls().is_enabled(NavControl::Next));
    }
}
