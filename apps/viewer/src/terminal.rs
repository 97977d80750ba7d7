use shared::domain::{NavControl, PageNumber};
use viewer_core::ViewSurface;

/// Terminal stand-in for the page shell. Mutations are buffered and drawn by
/// the caller through [`TerminalView::take_frame`].
#[derive(Debug, Default)]
pub struct TerminalView {
    content: String,
    indicator: String,
    previous_enabled: bool,
    next_enabled: bool,
    content_dirty: bool,
    status_dirty: bool,
}

impl TerminalView {
    /// Returns what changed since the last frame, or `None` if nothing did.
    pub fn take_frame(&mut self) -> Option<String> {
        if !self.content_dirty && !self.status_dirty {
            return None;
        }

        let mut frame = String::new();
        if self.content_dirty {
            frame.push_str(&"-".repeat(72));
            frame.push('\n');
            frame.push_str(self.content.trim_end());
            frame.push('\n');
        }
        frame.push_str(&self.status_line());
        frame.push('\n');

        self.content_dirty = false;
        self.status_dirty = false;
        Some(frame)
    }

    pub fn status_line(&self) -> String {
        let previous = if self.previous_enabled { "[p]rev" } else { " ---- " };
        let next = if self.next_enabled { "[n]ext" } else { " ---- " };
        format!("{previous}  {}  {next}", self.indicator)
    }
}

impl ViewSurface for TerminalView {
    fn replace_content(&mut self, markup: &str) {
        self.content = markup.to_string();
        self.content_dirty = true;
    }

    fn set_page_indicator(&mut self, text: &str) {
        self.indicator = text.to_string();
        self.status_dirty = true;
    }

    fn set_control_enabled(&mut self, control: NavControl, enabled: bool) {
        match control {
            NavControl::Previous => self.previous_enabled = enabled,
            NavControl::Next => self.next_enabled = enabled,
        }
        self.status_dirty = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    GoTo(PageNumber),
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "n" | "next" => Command::Next,
        "p" | "prev" | "previous" => Command::Previous,
        "s" | "status" => Command::Status,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        "g" | "goto" => {
            let raw = parts
                .next()
                .ok_or_else(|| "goto needs a page number".to_string())?;
            let page = raw
                .parse::<u32>()
                .map_err(|_| format!("'{raw}' is not a page number"))?;
            Command::GoTo(PageNumber(page))
        }
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };

    if parts.next().is_some() {
        return Err(format!("too many arguments for '{word}'"));
    }
    Ok(Some(command))
}

pub const HELP: &str = "commands: n|next  p|prev  g|goto <page>  s|status  q|quit";
