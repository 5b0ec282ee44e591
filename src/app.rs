//! App: terminal init, main loop, tick and key handling.

use crate::input::{Action, key_to_action};
use crate::records::{FileChallengeCache, RecordStore, config_dir};
use crate::theme::Theme;
use crate::{Difficulty, GameConfig, GameMode};
use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyEventKind};
use grainfall::challenge::{RunResult, cache_key};
use grainfall::{ChallengeManager, GameOverReason, Session, SessionConfig, SessionEvent};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before cursor movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding.
const REPEAT_INTERVAL_MS: u64 = 50;
/// ~60 FPS rendering.
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Mode,
    Difficulty,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_mode: GameMode,
    pub selected_difficulty: Difficulty,
    pub animation_start: Instant,
}

impl MenuState {
    fn new(config: &GameConfig) -> Self {
        Self {
            current_tab: MenuTab::Mode,
            selected_mode: config.mode,
            selected_difficulty: config.tier.into(),
            animation_start: Instant::now(),
        }
    }
}

/// How the finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Lost(GameOverReason),
    Cleared { stars: u8 },
}

/// Elimination flash: positions (fine grid) fading to background.
pub struct ClearFlash {
    pub cells: Vec<(i32, i32)>,
    pub effect: Option<Effect>,
    pub last_processed: Option<Instant>,
}

impl ClearFlash {
    /// Add cleared cells to the pending flash, or start one. A fade already under way
    /// restarts so every cleared cell fades together.
    pub fn merge(flash: &mut Option<Self>, positions: Vec<(i32, i32)>) {
        match flash {
            Some(existing) => {
                existing.cells.extend(positions);
                existing.effect = None;
                existing.last_processed = None;
            }
            None => {
                *flash = Some(Self {
                    cells: positions,
                    effect: None,
                    last_processed: None,
                });
            }
        }
    }
}

/// Everything `ui::draw` needs apart from the flash it animates.
pub struct View<'a> {
    pub screen: Screen,
    pub session: &'a Session,
    pub theme: &'a Theme,
    pub cursor: (i32, i32),
    pub slot: usize,
    pub paused: bool,
    pub play_time: Duration,
    pub outcome: Option<Outcome>,
    pub new_record: bool,
    pub best_endless: u64,
    pub message: Option<&'a str>,
    pub menu: &'a MenuState,
    pub quit_selected: Option<QuitOption>,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: Session,
    records: RecordStore,
    challenges: ChallengeManager<FileChallengeCache>,
    screen: Screen,
    paused: bool,
    /// Logical cell under the top-left of the selected piece.
    cursor: (i32, i32),
    slot: usize,
    play_time: Duration,
    last_frame: Instant,
    last_tick: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    flash: Option<ClearFlash>,
    outcome: Option<Outcome>,
    new_record: bool,
    message: Option<String>,
    menu_state: MenuState,
    quit_selected: QuitOption,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, no_menu: bool) -> Result<Self> {
        let dir = config_dir();
        let session = Session::new(SessionConfig::endless(config.board, config.high_color));
        let now = Instant::now();
        let mut app = Self {
            menu_state: MenuState::new(&config),
            theme,
            session,
            records: RecordStore::open(&dir),
            challenges: ChallengeManager::new(FileChallengeCache::new(&dir), config.board),
            screen: Screen::Menu,
            paused: false,
            cursor: (0, 0),
            slot: 0,
            play_time: Duration::ZERO,
            last_frame: now,
            last_tick: now,
            repeat_state: None,
            last_repeat_fire: None,
            flash: None,
            outcome: None,
            new_record: false,
            message: None,
            quit_selected: QuitOption::Resume,
            config,
        };
        if no_menu {
            app.start_game();
        }
        Ok(app)
    }

    fn start_game(&mut self) {
        let session_config = match self.config.mode {
            GameMode::Endless => SessionConfig::endless(self.config.board, self.config.high_color),
            GameMode::Daily => {
                let date = self.config.challenge_date();
                let challenge = self.challenges.challenge_for(date, self.config.tier);
                self.records.start_daily(&cache_key(date, self.config.tier));
                self.save_records();
                SessionConfig::daily(challenge)
            }
        };
        self.session = Session::new(session_config);
        self.reset_play_state();
    }

    /// Same mode and board again; a daily counts as a fresh attempt.
    fn restart_game(&mut self) {
        if let Some(challenge) = self.session.challenge() {
            let key = cache_key(self.config.challenge_date(), challenge.tier);
            self.records.start_daily(&key);
            self.save_records();
        }
        self.session.restart();
        self.reset_play_state();
    }

    fn reset_play_state(&mut self) {
        let (lw, _) = self.session.grid().logical_dims();
        self.cursor = (lw as i32 / 2 - 1, 0);
        self.slot = 0;
        self.screen = Screen::Playing;
        self.paused = false;
        self.play_time = Duration::ZERO;
        self.last_tick = Instant::now();
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.flash = None;
        self.outcome = None;
        self.new_record = false;
        self.message = None;
        self.clamp_cursor();
    }

    fn save_records(&self) {
        if let Err(e) = self.records.save() {
            log::warn!("could not save records: {e}");
        }
    }

    /// Keep the selected piece's bounding box on the board.
    fn clamp_cursor(&mut self) {
        let (lw, lh) = self.session.grid().logical_dims();
        let (ew, eh) = self
            .session
            .previews()
            .get_slot(self.slot)
            .map_or((1, 1), |p| p.extent());
        let max_x = (lw as i32 - ew).max(0);
        let max_y = (lh as i32 - eh).max(0);
        self.cursor.0 = self.cursor.0.clamp(0, max_x);
        self.cursor.1 = self.cursor.1.clamp(0, max_y);
    }

    fn select_slot(&mut self, slot: usize) {
        if slot < self.session.previews().len() {
            self.slot = slot;
            self.clamp_cursor();
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Left => self.cursor.0 -= 1,
            Action::Right => self.cursor.0 += 1,
            Action::Up => self.cursor.1 -= 1,
            Action::Down => self.cursor.1 += 1,
            Action::RotateCw | Action::RotateCcw => {
                if let Some(piece) = self.session.previews_mut().get_slot_mut(self.slot) {
                    if action == Action::RotateCw {
                        piece.rotate_cw();
                    } else {
                        piece.rotate_ccw();
                    }
                }
            }
            Action::Slot(i) => self.select_slot(i),
            Action::NextSlot => {
                let n = self.session.previews().len().max(1);
                self.select_slot((self.slot + 1) % n);
            }
            Action::Place => {
                let (x, y) = self.cursor;
                self.message = self.session.place(self.slot, x, y).err().map(|e| e.to_string());
                self.repeat_state = None;
            }
            Action::Pause | Action::Restart | Action::Quit | Action::None => {}
        }
        self.clamp_cursor();
    }

    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let Some((action, first)) = self.repeat_state else {
            return;
        };
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next =
            self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action);
            self.last_repeat_fire = Some(now);
        }
    }

    fn handle_session_events(&mut self) {
        for event in self.session.drain_events() {
            match event {
                SessionEvent::Eliminated { positions, .. } => {
                    if self.config.animation {
                        ClearFlash::merge(&mut self.flash, positions);
                    }
                }
                SessionEvent::ChainEnded { chain } if chain > 1 => {
                    self.message = Some(format!("Chain x{chain}!"));
                }
                SessionEvent::GameOver(reason) => {
                    if self.config.mode == GameMode::Endless {
                        self.new_record = self.records.submit_endless(self.session.score());
                        self.save_records();
                    }
                    self.finish(Outcome::Lost(reason));
                }
                SessionEvent::ChallengeComplete { steps, score } => {
                    let time_secs = self.play_time.as_secs();
                    let stars = self
                        .session
                        .challenge()
                        .map_or(1, |c| c.stars().rate(time_secs, steps));
                    let key = cache_key(self.config.challenge_date(), self.config.tier);
                    let run = RunResult {
                        time_secs,
                        steps,
                        score,
                        stars,
                    };
                    self.new_record = self.records.complete_daily(&key, run, Utc::now());
                    self.save_records();
                    self.finish(Outcome::Cleared { stars });
                }
                SessionEvent::Placed { .. } | SessionEvent::ChainEnded { .. } => {}
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.screen = Screen::GameOver;
        self.repeat_state = None;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events make held-key auto-repeat stop cleanly where supported.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_interval = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        loop {
            let now = Instant::now();
            let frame_delta = now.saturating_duration_since(self.last_frame);
            self.last_frame = now;
            if self.screen == Screen::Playing && !self.paused {
                self.play_time += frame_delta;
            }

            let view = View {
                screen: self.screen,
                session: &self.session,
                theme: &self.theme,
                cursor: self.cursor,
                slot: self.slot,
                paused: self.paused,
                play_time: self.play_time,
                outcome: self.outcome,
                new_record: self.new_record,
                best_endless: self.records.book().best_endless,
                message: self.message.as_deref(),
                menu: &self.menu_state,
                quit_selected: (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
            };
            let flash = &mut self.flash;
            terminal.draw(|f| crate::ui::draw(f, &view, flash, now))?;

            if self
                .flash
                .as_ref()
                .and_then(|fl| fl.effect.as_ref())
                .is_some_and(Effect::done)
            {
                self.flash = None;
            }

            let timeout = FRAME.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    let action = key_to_action(key);
                    if key.kind != KeyEventKind::Press {
                        if key.kind == KeyEventKind::Release
                            && self.repeat_state.map(|(a, _)| a) == Some(action)
                        {
                            self.repeat_state = None;
                            self.last_repeat_fire = None;
                        }
                        continue;
                    }
                    if self.repeat_state.map(|(a, _)| a) == Some(action) {
                        continue;
                    }
                    if self.handle_key(action) {
                        return Ok(());
                    }
                }
            }

            if self.screen == Screen::Playing && !self.paused {
                self.tick_repeat();
                // Sand waits while the flash plays.
                if self.flash.is_none() && self.last_tick.elapsed() >= tick_interval {
                    self.last_tick = Instant::now();
                    for _ in 0..self.config.steps_per_tick {
                        self.session.tick();
                    }
                }
                self.handle_session_events();
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, action: Action) -> bool {
        match self.screen {
            Screen::Menu => return self.handle_menu_key(action),
            Screen::Playing => {
                if self.paused {
                    match action {
                        Action::Pause => self.paused = false,
                        Action::Quit => self.open_quit_menu(),
                        _ => {}
                    }
                } else {
                    match action {
                        Action::Pause => self.paused = true,
                        Action::Quit => self.open_quit_menu(),
                        Action::Restart => self.restart_game(),
                        _ => {
                            self.apply_action(action);
                            if action.repeats() {
                                self.repeat_state = Some((action, Instant::now()));
                                self.last_repeat_fire = None;
                            }
                        }
                    }
                }
            }
            Screen::QuitMenu => match action {
                Action::Down | Action::Right => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::MainMenu,
                        QuitOption::MainMenu => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::Up | Action::Left => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::MainMenu => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::MainMenu,
                    };
                }
                Action::Place => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::MainMenu => self.open_menu(),
                    QuitOption::Exit => return true,
                },
                Action::Pause | Action::Quit => self.screen = Screen::Playing,
                _ => {}
            },
            Screen::GameOver => match action {
                Action::Quit => return true,
                Action::Restart => self.restart_game(),
                Action::Place => self.open_menu(),
                _ => {}
            },
        }
        false
    }

    fn handle_menu_key(&mut self, action: Action) -> bool {
        let menu = &mut self.menu_state;
        match action {
            Action::Quit => return true,
            Action::Down | Action::NextSlot => {
                menu.current_tab = match menu.current_tab {
                    MenuTab::Mode => MenuTab::Difficulty,
                    MenuTab::Difficulty => MenuTab::Start,
                    MenuTab::Start => MenuTab::Mode,
                };
            }
            Action::Up => {
                menu.current_tab = match menu.current_tab {
                    MenuTab::Mode => MenuTab::Start,
                    MenuTab::Difficulty => MenuTab::Mode,
                    MenuTab::Start => MenuTab::Difficulty,
                };
            }
            Action::Left | Action::Right => match menu.current_tab {
                MenuTab::Mode => {
                    menu.selected_mode = match menu.selected_mode {
                        GameMode::Endless => GameMode::Daily,
                        GameMode::Daily => GameMode::Endless,
                    };
                }
                MenuTab::Difficulty => {
                    let forward = action == Action::Right;
                    menu.selected_difficulty = match (menu.selected_difficulty, forward) {
                        (Difficulty::Easy, true) | (Difficulty::Hard, false) => Difficulty::Normal,
                        (Difficulty::Normal, true) | (Difficulty::Easy, false) => Difficulty::Hard,
                        (Difficulty::Hard, true) | (Difficulty::Normal, false) => Difficulty::Easy,
                    };
                }
                MenuTab::Start => {}
            },
            Action::Place => {
                if menu.current_tab == MenuTab::Start {
                    self.config.mode = menu.selected_mode;
                    self.config.tier = menu.selected_difficulty.into();
                    self.start_game();
                } else {
                    menu.current_tab = MenuTab::Start;
                }
            }
            _ => {}
        }
        false
    }

    fn open_quit_menu(&mut self) {
        self.screen = Screen::QuitMenu;
        self.quit_selected = QuitOption::Resume;
        self.repeat_state = None;
    }

    fn open_menu(&mut self) {
        self.screen = Screen::Menu;
        self.menu_state = MenuState::new(&self.config);
    }
}
