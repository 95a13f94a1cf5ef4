//! Application state and event handling

pub mod command;
pub mod input;
pub mod state;

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio_util::sync::CancellationToken;

use crate::clipboard::{ClipboardService, code};
use crate::config::Config;
use crate::document::{ContentBlock, ContentRenderer, DocumentSource, FetchError, fetch_document};
use crate::events::{self, AppEvent, EventReceiver, EventSender};
use crate::navigation::{Activation, Viewport, observer};
use crate::progress::Chapter;
use crate::search::{EntryTarget, SearchIndex};
use crate::storage::Persistence;
use crate::theme::Theme;
use crate::ui;
use command::{Command, ParseResult, parse_command};
use input::{Action, key_with_modifier_to_action};
use state::{
    AppState, CommandMode, Overlay, Panel, ProgressOverlay, Screen, SearchOverlay, TemplateOverlay,
};

/// Lines scrolled per mouse wheel notch
const WHEEL_LINES: isize = 3;

/// The main application
pub struct App {
    config: Config,
    theme: Theme,
    state: AppState,
    persistence: Persistence,
    clipboard: ClipboardService,
    renderer: ContentRenderer,
    client: reqwest::Client,
    source: Option<DocumentSource>,
    events: EventSender,
    receiver: EventReceiver,
    /// Cancels the in-flight document load
    cancel: CancellationToken,
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
}

impl App {
    /// Create a new application instance
    pub fn new(
        config: Config,
        persistence: Persistence,
        mut clipboard: ClipboardService,
        source: Option<DocumentSource>,
    ) -> Result<Self> {
        let client = crate::document::http_client().context("Failed to build HTTP client")?;
        let now = Instant::now();

        clipboard.load(&persistence);
        let mut state = AppState::new(&config, &persistence, now);
        state.copies = clipboard.count();

        let (events, receiver) = events::channel();

        Ok(Self {
            theme: config.active_theme(),
            renderer: ContentRenderer::from_config(&config),
            config,
            state,
            persistence,
            clipboard,
            client,
            source,
            events,
            receiver,
            cancel: CancellationToken::new(),
            terminal: None,
        })
    }

    /// Set up the terminal for TUI rendering
    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    /// Restore the terminal to its original state
    fn restore_terminal(&mut self) -> Result<()> {
        let Some(mut terminal) = self.terminal.take() else {
            return Ok(());
        };
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
        terminal.show_cursor()?;
        Ok(())
    }

    /// Run the application main loop
    pub async fn run(&mut self) -> Result<()> {
        // Set up panic hook to restore terminal
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
            original_hook(panic_info);
        }));

        self.terminal = Some(Self::setup_terminal()?);
        self.start_fetch();

        let result = self.event_loop().await;

        self.shutdown(Instant::now());
        self.restore_terminal()?;
        result
    }

    async fn event_loop(&mut self) -> Result<()> {
        loop {
            self.tick(Instant::now());
            self.draw()?;
            self.after_draw(Instant::now());

            while let Ok(event) = self.receiver.try_recv() {
                self.handle_event(event, Instant::now());
            }

            if event::poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key, Instant::now()) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::ScrollDown => self.state.content.scroll_by(WHEEL_LINES),
                        MouseEventKind::ScrollUp => self.state.content.scroll_by(-WHEEL_LINES),
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };
        let state = &mut self.state;
        let theme = &self.theme;
        terminal.draw(|frame| ui::draw(frame, state, theme))?;
        Ok(())
    }

    fn emit(&self, event: AppEvent) {
        // the receiver lives as long as the app
        let _ = self.events.send(event);
    }

    /// Begin (or restart) loading the document
    fn start_fetch(&mut self) {
        self.cancel.cancel();

        let Some(source) = self.source.clone() else {
            self.state.screen = Screen::Error {
                message: "No document given. Run `docent <FILE|URL>` or set `document` in the config."
                    .to_string(),
                retryable: false,
            };
            return;
        };

        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();
        self.state.screen = Screen::Loading { source: source.to_string() };

        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = fetch_document(&client, &source, cancel).await;
            let _ = events.send(AppEvent::DocumentFetched(result));
        });
    }

    /// Stop background work and flush session time
    fn shutdown(&mut self, now: Instant) {
        self.cancel.cancel();
        self.state.progress.flush(now, &mut self.persistence);
        tracing::info!(
            session_secs = self.state.progress.session_time().as_secs(),
            "Session ended"
        );
    }

    /// Time-driven updates, once per loop
    fn tick(&mut self, now: Instant) {
        self.state.content.step_animation(now);
        if let Some(activation) = self.state.observer.tick(now) {
            self.emit(AppEvent::SectionActivated(activation));
        }
        self.state.notifications.prune(now);
        self.state.progress.tick(now, &mut self.persistence);
    }

    /// Work that needs the fresh layout
    fn after_draw(&mut self, now: Instant) {
        self.scroll_to_pending(now);

        if !self.state.content.needs_measure() {
            return;
        }
        let content = &self.state.content;
        let Some(layout) = content.layout.as_ref() else {
            return;
        };

        let viewport = Viewport {
            offset: content.scroll_offset,
            height: content.visible_height,
            margin: self.config.viewport_margin,
        };
        let batch =
            observer::measure(viewport, layout.headings.iter().map(|(id, line)| (id.as_str(), *line)));
        self.state.content.mark_measured();

        if let Some(activation) = self.state.observer.on_visibility(&batch, now) {
            self.emit(AppEvent::SectionActivated(activation));
        }
    }

    fn handle_event(&mut self, event: AppEvent, now: Instant) {
        match event {
            AppEvent::DocumentFetched(Ok(text)) => self.load_document(&text),
            AppEvent::DocumentFetched(Err(FetchError::Cancelled)) => {
                tracing::debug!("Discarding cancelled load");
            }
            AppEvent::DocumentFetched(Err(e)) => {
                self.state.screen =
                    Screen::Error { message: e.to_string(), retryable: e.is_retryable() };
            }
            AppEvent::ContentReady => self.on_content_ready(now),
            AppEvent::SectionActivated(activation) => self.on_section_activated(&activation),
            AppEvent::CopyCountChanged(total) => {
                self.state.copies = total;
                self.state.progress.on_copy_count(
                    total,
                    &mut self.persistence,
                    &mut self.state.notifications,
                );
            }
        }
    }

    fn load_document(&mut self, text: &str) {
        let rendered = self.renderer.render(text);
        tracing::info!(
            title = %rendered.document.title,
            sections = rendered.document.sections.len(),
            words = rendered.document.word_count(),
            "Document ready"
        );

        self.state.document = Some(rendered.document);
        self.state.content = Default::default();
        self.state.screen = Screen::Reader;
        self.emit(AppEvent::ContentReady);
    }

    /// Wire the freshly rendered document into every component
    fn on_content_ready(&mut self, now: Instant) {
        let Some(document) = self.state.document.as_ref() else {
            return;
        };

        self.state.observer.observe(document.sections.iter().map(|s| s.id.clone()));
        self.state.navigation.rebuild(document, &self.persistence);
        self.state.search =
            SearchIndex::build(document, &self.state.navigation, &self.state.templates);

        let chapters: Vec<Chapter> = self
            .state
            .navigation
            .chapters()
            .map(|node| Chapter { id: node.id.clone(), title: node.title.clone() })
            .collect();
        self.state.progress.set_chapters(chapters);
        self.state.progress.set_manual_checkpoints(document.checklist().cloned());

        if let Some(id) = self.state.navigation.last_viewed(&self.persistence) {
            tracing::debug!(section = %id, "Restoring last viewed section");
            self.navigate_to(&id, now);
        }
    }

    fn on_section_activated(&mut self, activation: &Activation) {
        self.state.navigation.apply_activation(activation);
        self.state.progress.on_section_activated(&activation.current, &mut self.persistence);
    }

    /// Explicit navigation: highlight now, scroll with animation
    fn navigate_to(&mut self, id: &str, now: Instant) {
        let activation = self.state.navigation.navigate(
            id,
            &mut self.state.observer,
            &mut self.persistence,
            now,
        );
        self.follow_activation(activation, now);
    }

    /// Scroll the content to an explicit activation and announce it
    fn follow_activation(&mut self, activation: Activation, now: Instant) {
        self.state.content.pending_target = Some(activation.current.clone());
        self.scroll_to_pending(now);
        self.emit(AppEvent::SectionActivated(activation));
    }

    fn scroll_to_pending(&mut self, now: Instant) {
        let content = &mut self.state.content;
        let Some(id) = content.pending_target.as_deref() else {
            return;
        };
        let Some(line) = content.heading_line(id) else {
            if content.layout.is_some() {
                // heading is gone from this layout
                content.pending_target = None;
            }
            return;
        };

        let target = line.saturating_sub(self.config.header_offset);
        content.animate_to(target, now, self.config.scroll_animation());
        content.pending_target = None;
    }

    /// Handle a key press, returns true if should exit
    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if self.state.command_line.is_input_mode() {
            return self.handle_command_key(key, now);
        }

        if let Some(overlay) = self.state.overlay.take() {
            self.handle_overlay_key(overlay, key, now);
            return false;
        }

        if let Screen::Error { .. } = self.state.screen {
            if key.code == KeyCode::Char('r') {
                self.start_fetch();
                return false;
            }
        }

        let Some(action) = key_with_modifier_to_action(key.code, key.modifiers) else {
            return false;
        };
        self.handle_action(action, now)
    }

    fn handle_action(&mut self, action: Action, now: Instant) -> bool {
        match action {
            Action::Quit => return true,
            Action::CommandMode => self.state.command_line.enter_command_mode(),
            Action::DismissNotification => {
                self.state.notifications.dismiss_latest();
            }
            Action::Help => self.state.overlay = Some(Overlay::Help),
            _ if self.state.screen != Screen::Reader => {}

            Action::Down | Action::Up => {
                let delta = if action == Action::Down { 1 } else { -1 };
                match self.state.focused_panel {
                    Panel::Navigation => self.state.navigation.move_selection(delta),
                    Panel::Content => self.state.content.scroll_by(delta),
                }
            }
            Action::Top => match self.state.focused_panel {
                Panel::Navigation => self.state.navigation.select_first(),
                Panel::Content => self.state.content.scroll_to(0),
            },
            Action::Bottom => match self.state.focused_panel {
                Panel::Navigation => self.state.navigation.select_last(),
                Panel::Content => self.state.content.scroll_to(usize::MAX),
            },
            Action::PageDown | Action::PageUp | Action::HalfPageDown | Action::HalfPageUp => {
                let page = self.state.content.visible_height.max(2) as isize;
                let delta = match action {
                    Action::PageDown => page - 1,
                    Action::PageUp => -(page - 1),
                    Action::HalfPageDown => page / 2,
                    _ => -(page / 2),
                };
                self.state.content.scroll_by(delta);
            }
            Action::NextSection => self.step_section(1, now),
            Action::PrevSection => self.step_section(-1, now),

            Action::FocusNavigation => {
                if self.state.show_navigation {
                    self.state.focused_panel = Panel::Navigation;
                }
            }
            Action::FocusContent => self.state.focused_panel = Panel::Content,
            Action::SwitchFocus => {
                self.state.focused_panel = match self.state.focused_panel {
                    Panel::Content if self.state.show_navigation => Panel::Navigation,
                    _ => Panel::Content,
                };
            }
            Action::ToggleNavigation => {
                self.state.show_navigation = !self.state.show_navigation;
                if !self.state.show_navigation {
                    self.state.focused_panel = Panel::Content;
                }
                self.state.content.invalidate();
            }
            Action::ToggleExpand => {
                if self.state.focused_panel == Panel::Navigation {
                    self.state.navigation.toggle_selected(&mut self.persistence);
                }
            }
            Action::Select => {
                if self.state.focused_panel == Panel::Navigation {
                    let state = &mut self.state;
                    let activation = state.navigation.activate_selected(
                        &mut state.observer,
                        &mut self.persistence,
                        now,
                    );
                    if let Some(activation) = activation {
                        self.follow_activation(activation, now);
                    }
                }
            }
            Action::Back => {
                self.state.focused_panel = Panel::Content;
                self.state.command_line.message = None;
            }

            Action::Search => self.state.overlay = Some(Overlay::Search(SearchOverlay::default())),
            Action::Templates => {
                self.state.overlay = Some(Overlay::Templates(TemplateOverlay::default()));
            }
            Action::Progress => {
                self.state.overlay = Some(Overlay::Progress(ProgressOverlay::default()));
            }
            Action::CopyCode => self.copy_code_in_view(),
            Action::Bookmark => self.toggle_bookmark(),
            Action::MarkComplete => self.mark_current_chapter_complete(),
        }
        false
    }

    /// Explicitly navigate to the next or previous section
    fn step_section(&mut self, delta: isize, now: Instant) {
        let Some(document) = self.state.document.as_ref() else {
            return;
        };
        if document.sections.is_empty() {
            return;
        }

        let target = match self.state.current_section() {
            Some(current) => {
                let Some(index) = document.sections.iter().position(|s| s.id == current) else {
                    return;
                };
                let last = document.sections.len() - 1;
                index.saturating_add_signed(delta).min(last)
            }
            None => 0,
        };

        let id = document.sections[target].id.clone();
        if self.state.current_section() != Some(id.as_str()) {
            self.navigate_to(&id, now);
        }
    }

    fn copy_code_in_view(&mut self) {
        let Some(document) = self.state.document.as_ref() else {
            return;
        };
        let block = self.state.content.code_block_in_view().and_then(|i| document.blocks.get(i));
        let Some(ContentBlock::Code(block)) = block else {
            self.state.command_line.set_error("No code block in view");
            return;
        };

        let text = code::clean_code_text(&block.code);
        let kind = code::copy_kind(&text, block.language.as_deref());
        match self.clipboard.copy(&text, &kind, &mut self.persistence, &mut self.state.notifications)
        {
            Ok(receipt) => self.emit(AppEvent::CopyCountChanged(receipt.total)),
            Err(e) => tracing::debug!(error = %e, "Code copy failed"),
        }
    }

    fn toggle_bookmark(&mut self) {
        let Some(id) = self.state.current_section().map(str::to_string) else {
            self.state.command_line.set_error("No current section");
            return;
        };
        let title = self.state.navigation.node(&id).map_or(id.clone(), |n| n.title.clone());

        if self.state.navigation.toggle_bookmark(&id, &mut self.persistence) {
            self.state.notifications.info("Bookmarked", title);
        } else {
            self.state.notifications.info("Bookmark removed", title);
        }
    }

    /// Chapter (top-level entry) containing the current section
    fn current_chapter(&self) -> Option<String> {
        let nodes = self.state.navigation.nodes();
        let current = self.state.current_section()?;
        let mut index = nodes.iter().position(|n| n.id == current)?;
        while let Some(parent) = nodes[index].parent {
            index = parent;
        }
        Some(nodes[index].id.clone())
    }

    fn mark_current_chapter_complete(&mut self) {
        let Some(chapter) = self.current_chapter() else {
            self.state.command_line.set_error("Not inside a chapter");
            return;
        };
        let completed = self.state.progress.mark_chapter_completed(
            &chapter,
            &mut self.persistence,
            &mut self.state.notifications,
        );
        if !completed {
            self.state.command_line.set_message("Chapter already completed");
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        let cl = &mut self.state.command_line;
        match key.code {
            KeyCode::Esc => cl.exit_input_mode(),
            KeyCode::Enter => {
                let input = cl.input.clone();
                cl.add_to_history(input.clone());
                cl.exit_input_mode();
                return self.execute_command_line(&input, now);
            }
            KeyCode::Backspace if cl.input.is_empty() => cl.exit_input_mode(),
            KeyCode::Backspace => cl.delete_char(),
            KeyCode::Left => cl.move_left(),
            KeyCode::Right => cl.move_right(),
            KeyCode::Up => cl.history_up(),
            KeyCode::Down => cl.history_down(),
            KeyCode::Char(c) => cl.insert_char(c),
            _ => {}
        }
        false
    }

    fn execute_command_line(&mut self, input: &str, now: Instant) -> bool {
        match parse_command(input) {
            ParseResult::Ok(command) => self.execute_command(command, now),
            ParseResult::UnknownCommand(cmd) => {
                self.state.command_line.set_error(format!("Unknown command: {cmd}"));
                false
            }
            ParseResult::MissingArgument(cmd) => {
                self.state.command_line.set_error(format!(":{cmd} needs an argument"));
                false
            }
        }
    }

    /// Execute a parsed command, returns true if should exit
    fn execute_command(&mut self, command: Command, now: Instant) -> bool {
        match command {
            Command::Quit => return true,
            Command::Nop => self.state.command_line.message = None,
            Command::Help => self.state.overlay = Some(Overlay::Help),
            Command::Goto(target) => match self.resolve_section(&target) {
                Some(id) => self.navigate_to(&id, now),
                None => self.state.command_line.set_error(format!("No section matches '{target}'")),
            },
            Command::Search(query) => {
                let results = self.state.search.perform(
                    &query,
                    &self.state.templates,
                    &mut self.state.history,
                    &mut self.persistence,
                );
                self.state.overlay =
                    Some(Overlay::Search(SearchOverlay { query, results, selected: 0 }));
            }
            Command::Bookmark => self.toggle_bookmark(),
            Command::Templates => {
                self.state.overlay = Some(Overlay::Templates(TemplateOverlay::default()));
            }
            Command::Progress => {
                self.state.overlay = Some(Overlay::Progress(ProgressOverlay::default()));
            }
            Command::ResetProgress => {
                self.state.progress.reset(now, &mut self.persistence);
                self.clipboard.reset(&mut self.persistence);
                self.state.copies = 0;
                self.state.content.invalidate();
                self.state.notifications.info("Progress reset", "Starting over from a clean slate");
            }
        }
        false
    }

    /// Section id for `:goto`: exact id first, then a title match
    fn resolve_section(&self, target: &str) -> Option<String> {
        let document = self.state.document.as_ref()?;
        if let Some(section) = document.section(target) {
            return Some(section.id.clone());
        }
        let needle = target.to_lowercase();
        document
            .sections
            .iter()
            .find(|s| s.title.to_lowercase().contains(&needle))
            .map(|s| s.id.clone())
    }

    fn handle_overlay_key(&mut self, overlay: Overlay, key: KeyEvent, now: Instant) {
        // the overlay was taken out of state; put it back unless closed
        let next = match overlay {
            Overlay::Help => None,
            Overlay::Search(search) => self.handle_search_key(search, key, now),
            Overlay::Templates(templates) => self.handle_templates_key(templates, key),
            Overlay::Progress(progress) => self.handle_progress_key(progress, key),
        };
        if self.state.overlay.is_none() {
            self.state.overlay = next;
        }
    }

    fn handle_search_key(
        &mut self,
        mut search: SearchOverlay,
        key: KeyEvent,
        now: Instant,
    ) -> Option<Overlay> {
        let history_len = self.state.history.entries().len();
        let rows = if search.query.is_empty() { history_len } else { search.results.len() };

        match key.code {
            KeyCode::Esc => return None,
            KeyCode::Up => search.selected = search.selected.saturating_sub(1),
            KeyCode::Down => search.selected = (search.selected + 1).min(rows.saturating_sub(1)),
            KeyCode::Backspace => {
                search.query.pop();
                self.refresh_search(&mut search);
            }
            KeyCode::Char(c) => {
                search.query.push(c);
                self.refresh_search(&mut search);
            }
            KeyCode::Enter if search.query.is_empty() => {
                let Some(query) = self.state.history.entries().get(search.selected).cloned() else {
                    return Some(Overlay::Search(search));
                };
                search.results = self.state.search.perform(
                    &query,
                    &self.state.templates,
                    &mut self.state.history,
                    &mut self.persistence,
                );
                search.query = query;
                search.selected = 0;
            }
            KeyCode::Enter => {
                // records the query in history
                let results = self.state.search.perform(
                    &search.query,
                    &self.state.templates,
                    &mut self.state.history,
                    &mut self.persistence,
                );
                let Some(result) = results.get(search.selected) else {
                    search.results = results;
                    return Some(Overlay::Search(search));
                };
                let target = result.entry.target.clone();
                return self.open_search_target(target, now);
            }
            _ => {}
        }
        Some(Overlay::Search(search))
    }

    fn refresh_search(&self, search: &mut SearchOverlay) {
        search.results = self.state.search.search(&search.query, &self.state.templates);
        search.selected = 0;
    }

    fn open_search_target(&mut self, target: EntryTarget, now: Instant) -> Option<Overlay> {
        match target {
            EntryTarget::Section(id) => {
                self.navigate_to(&id, now);
                None
            }
            EntryTarget::Top => {
                let duration = self.config.scroll_animation();
                self.state.content.animate_to(0, now, duration);
                None
            }
            EntryTarget::Template(id) => {
                let selected = self
                    .state
                    .templates
                    .filter(None, "")
                    .iter()
                    .position(|t| t.id == id)
                    .unwrap_or(0);
                Some(Overlay::Templates(TemplateOverlay { selected, ..Default::default() }))
            }
        }
    }

    fn handle_templates_key(&mut self, mut browser: TemplateOverlay, key: KeyEvent) -> Option<Overlay> {
        let count = self.state.templates.filter(browser.category, &browser.filter).len();

        match key.code {
            KeyCode::Esc => return None,
            KeyCode::Up => browser.selected = browser.selected.saturating_sub(1),
            KeyCode::Down => browser.selected = (browser.selected + 1).min(count.saturating_sub(1)),
            KeyCode::Tab => browser.next_category(),
            KeyCode::Backspace => {
                browser.filter.pop();
                browser.selected = 0;
            }
            KeyCode::Char(c) => {
                browser.filter.push(c);
                browser.selected = 0;
            }
            KeyCode::Enter => {
                let id = self
                    .state
                    .templates
                    .filter(browser.category, &browser.filter)
                    .get(browser.selected)
                    .map(|t| t.id.clone());
                if let Some(id) = id {
                    self.copy_template(&id);
                }
            }
            _ => {}
        }
        Some(Overlay::Templates(browser))
    }

    fn copy_template(&mut self, id: &str) {
        let result = self.state.templates.copy(
            id,
            &mut self.clipboard,
            &mut self.persistence,
            &mut self.state.notifications,
        );
        match result {
            Ok(receipt) => self.emit(AppEvent::CopyCountChanged(receipt.total)),
            Err(e) => tracing::debug!(template = id, error = %e, "Template copy failed"),
        }
    }

    fn handle_progress_key(&mut self, mut panel: ProgressOverlay, key: KeyEvent) -> Option<Overlay> {
        let chapters = self.state.progress.chapters().len();
        let rows = chapters + self.state.progress.manual_checkpoints().len();

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return None,
            KeyCode::Up | KeyCode::Char('k') => panel.selected = panel.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                panel.selected = (panel.selected + 1).min(rows.saturating_sub(1));
            }
            KeyCode::Enter | KeyCode::Char(' ') if panel.selected < chapters => {
                let id = self.state.progress.chapters()[panel.selected].id.clone();
                self.state.progress.mark_chapter_completed(
                    &id,
                    &mut self.persistence,
                    &mut self.state.notifications,
                );
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let manual = self.state.progress.manual_checkpoints();
                if let Some(item) = manual.get(panel.selected - chapters) {
                    let id = item.id.clone();
                    self.state.progress.toggle_manual_checkpoint(&id, &mut self.persistence);
                    self.state.content.invalidate();
                }
            }
            KeyCode::Char('e') => self.export_progress(),
            _ => {}
        }
        Some(Overlay::Progress(panel))
    }

    fn export_progress(&mut self) {
        let result = export_path().and_then(|path| {
            let export = self.state.progress.export(self.state.copies);
            let json = serde_json::to_string_pretty(&export)?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        });

        match result {
            Ok(path) => {
                self.state.notifications.success("Progress exported", path.display().to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Progress export failed");
                self.state.notifications.error("Export failed", e.to_string());
            }
        }
    }
}

fn export_path() -> Result<PathBuf> {
    Ok(Config::data_dir()?.join("progress-export.json"))
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clipboard::testing::{broken_service, working_service};
    use crate::notify::Level;
    use crate::storage::keys;

    const DOC: &str = "# Guide

Intro paragraph long enough to be indexed by search.

## Quick start

Install it first.

```bash
npm install -g tool
```

## Workflow

### Planning

- [ ] Write a plan
- [ ] Review the plan

## Reference

The end.
";

    fn app_with(clipboard: ClipboardService, persistence: Persistence) -> App {
        let config = Config::default();
        App::new(config, persistence, clipboard, None).unwrap()
    }

    fn drain(app: &mut App, now: Instant) {
        while let Ok(event) = app.receiver.try_recv() {
            app.handle_event(event, now);
        }
    }

    /// Load the document and lay it out like a draw would
    fn loaded(app: &mut App, now: Instant) {
        app.handle_event(AppEvent::DocumentFetched(Ok(DOC.to_string())), now);
        drain(app, now);
        layout(app);
    }

    fn layout(app: &mut App) {
        app.state.content.visible_height = 20;
        let state = &mut app.state;
        if let Some(document) = state.document.as_ref() {
            ui::content::ensure_layout(&mut state.content, document, &state.progress, &app.theme, 60);
        }
    }

    #[test]
    fn missing_source_shows_error() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        app.start_fetch();
        assert!(matches!(app.state.screen, Screen::Error { retryable: false, .. }));
    }

    #[test]
    fn fetch_failure_offers_retry() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let err = FetchError::Status { status: 404, url: "https://example.com/doc.md".into() };
        app.handle_event(AppEvent::DocumentFetched(Err(err)), Instant::now());
        assert!(matches!(app.state.screen, Screen::Error { retryable: true, .. }));
    }

    #[test]
    fn content_ready_wires_components() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        loaded(&mut app, Instant::now());

        assert_eq!(app.state.screen, Screen::Reader);
        assert!(!app.state.navigation.nodes().is_empty());
        assert!(!app.state.search.is_empty());
        assert_eq!(app.state.progress.manual_checkpoints().len(), 2);
        assert_eq!(
            app.state.progress.chapters().iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["quick-start", "workflow", "reference"]
        );
    }

    #[test]
    fn explicit_navigation_scrolls_and_persists() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);

        app.execute_command(Command::Goto("workflow".into()), now);
        drain(&mut app, now);

        assert_eq!(app.state.current_section(), Some("workflow"));
        assert_eq!(app.persistence.get::<String>(keys::ACTIVE_SECTION).as_deref(), Some("workflow"));
        let line = app.state.content.heading_line("workflow").unwrap();
        let animation = app.state.content.animation.unwrap();
        assert_eq!(animation.to, line - app.config.header_offset);
    }

    #[test]
    fn selecting_a_navigation_entry_navigates() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);

        app.state.focused_panel = Panel::Navigation;
        app.handle_action(Action::Bottom, now);
        app.handle_action(Action::Select, now);
        drain(&mut app, now);

        assert_eq!(app.state.current_section(), Some("reference"));
        assert_eq!(app.persistence.get::<String>(keys::ACTIVE_SECTION).as_deref(), Some("reference"));
        assert!(app.state.content.animation.is_some());
    }

    #[test]
    fn passive_signal_inside_window_is_ignored() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);

        app.execute_command(Command::Goto("reference".into()), now);
        drain(&mut app, now);

        // viewport still at the top while the animation runs
        app.state.content.animation = None;
        app.after_draw(now + Duration::from_millis(100));
        drain(&mut app, now);
        assert_eq!(app.state.current_section(), Some("reference"));

        // after the window the observer settles on what is actually visible
        app.tick(now + Duration::from_secs(2));
        drain(&mut app, now);
        assert_ne!(app.state.current_section(), Some("reference"));
    }

    #[test]
    fn last_viewed_section_is_restored() {
        let mut persistence = Persistence::in_memory();
        persistence.set(keys::ACTIVE_SECTION, "planning");
        let mut app = app_with(working_service(), persistence);
        loaded(&mut app, Instant::now());
        app.after_draw(Instant::now());

        assert_eq!(app.state.current_section(), Some("planning"));
        assert!(app.state.content.animation.is_some());
    }

    #[test]
    fn copy_code_counts_and_notifies() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);

        app.handle_action(Action::CopyCode, now);
        drain(&mut app, now);

        assert_eq!(app.state.copies, 1);
        assert_eq!(app.persistence.get::<u64>(keys::COPY_COUNT), Some(1));
        // success toast plus the first-copy milestone
        assert_eq!(app.state.notifications.count(Level::Success), 1);
        assert_eq!(app.state.notifications.count(Level::Achievement), 1);
    }

    #[test]
    fn failed_copy_leaves_counters() {
        let mut app = app_with(broken_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);

        app.handle_action(Action::CopyCode, now);
        drain(&mut app, now);

        assert_eq!(app.state.copies, 0);
        assert_eq!(app.persistence.get::<u64>(keys::COPY_COUNT), None);
        assert_eq!(app.state.notifications.count(Level::Error), 1);
    }

    #[test]
    fn bookmark_current_section() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);
        app.execute_command(Command::Goto("quick start".into()), now);
        drain(&mut app, now);

        app.handle_action(Action::Bookmark, now);
        assert!(app.state.navigation.is_bookmarked("quick-start"));
        app.execute_command(Command::Bookmark, now);
        assert!(!app.state.navigation.is_bookmarked("quick-start"));
    }

    #[test]
    fn mark_complete_uses_chapter_of_nested_section() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);
        app.execute_command(Command::Goto("planning".into()), now);
        drain(&mut app, now);

        app.handle_action(Action::MarkComplete, now);
        assert_eq!(
            app.state.progress.section_status("workflow"),
            crate::progress::SectionStatus::Completed
        );
    }

    #[test]
    fn goto_unknown_section_reports_error() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);
        app.execute_command(Command::Goto("nowhere".into()), now);
        assert!(app.state.command_line.is_error);
    }

    #[test]
    fn search_command_records_history() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);

        app.execute_command(Command::Search("workflow".into()), now);
        let Some(Overlay::Search(search)) = &app.state.overlay else {
            panic!("search overlay should be open");
        };
        assert!(!search.results.is_empty());
        assert_eq!(app.state.history.entries(), ["workflow".to_string()]);
    }

    #[test]
    fn reset_progress_clears_counts() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);
        app.handle_action(Action::CopyCode, now);
        drain(&mut app, now);

        app.execute_command(Command::ResetProgress, now);
        assert_eq!(app.state.copies, 0);
        assert_eq!(app.persistence.get::<u64>(keys::COPY_COUNT), None);
    }

    #[test]
    fn quit_command_exits() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        assert!(app.execute_command(Command::Quit, Instant::now()));
        assert!(app.handle_action(Action::Quit, Instant::now()));
    }

    #[test]
    fn next_section_steps_through_document() {
        let mut app = app_with(working_service(), Persistence::in_memory());
        let now = Instant::now();
        loaded(&mut app, now);

        app.handle_action(Action::NextSection, now);
        drain(&mut app, now);
        let first = app.state.current_section().map(str::to_string);
        app.handle_action(Action::NextSection, now);
        drain(&mut app, now);
        assert_ne!(app.state.current_section().map(str::to_string), first);
    }
}
