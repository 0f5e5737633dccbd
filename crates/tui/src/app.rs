use std::{
    collections::{HashMap, HashSet},
    future::Future,
    io,
    path::PathBuf,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ludex_core::{
    classify,
    models::{genre_by_slug, FavoriteGame, Game, Review, UserProfile, GENRES, RATING_LABELS},
    search::{SearchDebouncer, SearchOutcome},
    Classification, FeedCell, FetchError, Services,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc, task::AbortHandle};
use tracing::{debug, error, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 500;
const RAIL_ITEM_WIDTH: usize = 24;
const NAV_SCREENS: [Screen; 5] = [
    Screen::Home,
    Screen::Genres,
    Screen::Search,
    Screen::Favorites,
    Screen::Account,
];

type Rails = Vec<(String, Vec<Game>)>;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    danger: Color,
    on_accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            danger: Color::Red,
            on_accent: Color::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Home,
    Genres,
    Search,
    Details,
    Favorites,
    Account,
}

impl Screen {
    fn title(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Genres => "Genres",
            Screen::Search => "Search",
            Screen::Details => "Details",
            Screen::Favorites => "Favorites",
            Screen::Account => "Account",
        }
    }

    /// Next navigable screen; details is only reachable by opening a game.
    fn cycle(self, delta: isize) -> Self {
        let idx = NAV_SCREENS
            .iter()
            .position(|screen| *screen == self)
            .unwrap_or(0) as isize;
        let len = NAV_SCREENS.len() as isize;
        NAV_SCREENS[(idx + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenreFocus {
    List,
    Games,
}

/// Background loads that belong to one screen and stop when it is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TaskScope {
    Details,
    Genre,
}

impl TaskScope {
    fn context(self) -> &'static str {
        match self {
            TaskScope::Details => "details task",
            TaskScope::Genre => "genre task",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptKind {
    SignIn,
    SignUpEmail,
    SignUpUsername { email: String },
    Username,
    Picture,
    Review { game_id: i64, rating: usize },
}

impl PromptKind {
    fn title(&self) -> &'static str {
        match self {
            PromptKind::SignIn => "Sign in",
            PromptKind::SignUpEmail | PromptKind::SignUpUsername { .. } => "Create account",
            PromptKind::Username => "Change username",
            PromptKind::Picture => "Profile picture",
            PromptKind::Review { .. } => "Write a review",
        }
    }

    fn instruction(&self) -> String {
        match self {
            PromptKind::SignIn => "Email address".to_string(),
            PromptKind::SignUpEmail => "Email address for the new account".to_string(),
            PromptKind::SignUpUsername { email } => format!("Username for {email}"),
            PromptKind::Username => "New username".to_string(),
            PromptKind::Picture => "Path to an image file".to_string(),
            PromptKind::Review { .. } => "Your review".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct TextPrompt {
    kind: PromptKind,
    input: String,
    /// Cursor position in characters.
    cursor: usize,
}

impl TextPrompt {
    fn new(kind: PromptKind, initial: &str) -> Self {
        Self {
            kind,
            input: initial.to_string(),
            cursor: initial.chars().count(),
        }
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = (self.cursor as isize + delta).clamp(0, self.len() as isize);
        self.cursor = next as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.len();
    }

    fn insert(&mut self, ch: char) {
        if self.len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let idx = self.byte_index();
        self.input.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let idx = self.byte_index();
        self.input.remove(idx);
    }

    fn delete(&mut self) {
        if self.cursor < self.len() {
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    fn cycle_rating(&mut self, delta: isize) {
        if let PromptKind::Review { rating, .. } = &mut self.kind {
            let len = RATING_LABELS.len() as isize;
            *rating = (*rating as isize + delta).rem_euclid(len) as usize;
        }
    }

    fn value(&self) -> String {
        self.input.trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ListCursor {
    index: usize,
}

impl ListCursor {
    fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.index = 0;
            return;
        }
        let next = (self.index as isize + delta).clamp(0, len as isize - 1);
        self.index = next as usize;
    }

    fn clamp(&mut self, len: usize) {
        self.index = self.index.min(len.saturating_sub(1));
    }

    fn reset(&mut self) {
        self.index = 0;
    }

    fn list_state(&self, len: usize) -> ListState {
        let mut state = ListState::default();
        if len > 0 {
            state.select(Some(self.index.min(len - 1)));
        }
        state
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    HomeLoaded(Result<Rails, FetchError>),
    GenreLoaded {
        slug: &'static str,
        result: Result<Vec<Game>, FetchError>,
    },
    DetailsLoaded {
        id: i64,
        result: Result<Game, FetchError>,
    },
    RelatedLoaded {
        id: i64,
        result: Result<Vec<Game>, FetchError>,
    },
    ReviewsLoaded {
        id: i64,
        result: Result<Vec<Review>, FetchError>,
    },
    FavoriteChecked {
        id: i64,
        result: Result<bool, FetchError>,
    },
    FavoriteToggled {
        id: i64,
        name: String,
        result: Result<Option<bool>, FetchError>,
    },
    FavoritesLoaded(Result<Vec<FavoriteGame>, FetchError>),
    AccountUpdated {
        action: &'static str,
        result: Result<Option<UserProfile>, FetchError>,
    },
    ReviewSubmitted {
        id: i64,
        result: Result<Option<Review>, FetchError>,
    },
    OwnReviewLoaded {
        id: i64,
        result: Result<Option<Review>, FetchError>,
    },
}

/// Terminal frontend for browsing the catalog.
pub struct LudexApp {
    services: Services,
    theme: Theme,
    state: UiState,
    screen: Screen,
    return_to: Screen,
    home: FeedCell<Rails>,
    genre_slug: Option<&'static str>,
    genre_games: FeedCell<Vec<Game>>,
    search_query: String,
    search_results: FeedCell<Vec<Game>>,
    searching: bool,
    debouncer: SearchDebouncer,
    detail_id: Option<i64>,
    details: FeedCell<Game>,
    related: Vec<Game>,
    reviews: FeedCell<Vec<Review>>,
    is_favorite: bool,
    pending_toggles: HashSet<i64>,
    favorites: FeedCell<Vec<FavoriteGame>>,
    profile: Option<UserProfile>,
    prompt: Option<TextPrompt>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    search_tx: Option<mpsc::Sender<SearchOutcome>>,
    scoped_tasks: HashMap<TaskScope, Vec<AbortHandle>>,
}

impl LudexApp {
    pub fn new(services: Services) -> Self {
        let debouncer = services.search_debouncer();
        Self {
            services,
            theme: Theme::default(),
            state: UiState::default(),
            screen: Screen::Home,
            return_to: Screen::Home,
            home: FeedCell::new(),
            genre_slug: None,
            genre_games: FeedCell::new(),
            search_query: String::new(),
            search_results: FeedCell::new(),
            searching: false,
            debouncer,
            detail_id: None,
            details: FeedCell::new(),
            related: Vec::new(),
            reviews: FeedCell::new(),
            is_favorite: false,
            pending_toggles: HashSet::new(),
            favorites: FeedCell::new(),
            profile: None,
            prompt: None,
            event_tx: None,
            search_tx: None,
            scoped_tasks: HashMap::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        let (search_tx, mut search_rx) = mpsc::channel::<SearchOutcome>(8);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);
        self.search_tx = Some(search_tx);

        self.load_home();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break;
                    }
                }
                Some(outcome) = search_rx.recv() => self.handle_search_outcome(outcome),
            }

            if self.state.should_quit {
                break;
            }
        }

        self.debouncer.cancel();
        self.cancel_scope(TaskScope::Details);
        self.cancel_scope(TaskScope::Genre);
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        self.search_tx = None;
        Ok(())
    }

    fn event_sender(&mut self) -> Option<mpsc::Sender<AppEvent>> {
        let sender = self.event_tx.clone();
        if sender.is_none() {
            self.state
                .set_status("Internal error: event channel unavailable");
            error!("event_channel_missing");
        }
        sender
    }

    fn spawn_task<F>(&mut self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        if let Some(sender) = self.event_sender() {
            spawn(deliver(sender, task));
        }
    }

    /// Spawn a load owned by `scope`; [`cancel_scope`](Self::cancel_scope) aborts it.
    fn spawn_scoped<F>(&mut self, scope: TaskScope, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let Some(sender) = self.event_sender() else {
            return;
        };
        let work = spawn(deliver(sender, task));
        let handles = self.scoped_tasks.entry(scope).or_default();
        handles.retain(|handle| !handle.is_finished());
        handles.push(work.abort_handle());
        spawn(async move {
            if let Err(err) = work.await {
                classify(&FetchError::from(err), "Background load failed.").log(scope.context());
            }
        });
    }

    fn cancel_scope(&mut self, scope: TaskScope) {
        let Some(handles) = self.scoped_tasks.remove(&scope) else {
            return;
        };
        let mut aborted = 0;
        for handle in handles.iter().filter(|handle| !handle.is_finished()) {
            handle.abort();
            aborted += 1;
        }
        if aborted > 0 {
            debug!(?scope, aborted, "background loads cancelled");
        }
    }

    fn load_home(&mut self) {
        let catalog = self.services.catalog.clone();
        let genres = self.services.home_genres.clone();
        self.state.set_status("Loading games…");
        self.spawn_task(async move { AppEvent::HomeLoaded(catalog.home_rails(&genres).await) });
    }

    fn load_genre(&mut self, slug: &'static str) {
        if self.genre_slug != Some(slug) {
            self.genre_games.clear();
            self.state.genre_game_cursor.reset();
        }
        self.genre_slug = Some(slug);
        self.cancel_scope(TaskScope::Genre);
        let catalog = self.services.catalog.clone();
        self.spawn_scoped(TaskScope::Genre, async move {
            let result = catalog.fetch_genre(slug).await;
            AppEvent::GenreLoaded { slug, result }
        });
    }

    fn load_favorites(&mut self) {
        if self.profile.is_none() {
            self.favorites.clear();
            return;
        }
        let favorites = self.services.favorites.clone();
        self.spawn_task(async move { AppEvent::FavoritesLoaded(favorites.list().await) });
    }

    fn open_details(&mut self, id: i64) {
        if self.screen != Screen::Details {
            self.return_to = self.screen;
        }
        self.screen = Screen::Details;
        self.detail_id = Some(id);
        self.details.clear();
        self.related.clear();
        self.reviews.clear();
        self.is_favorite = false;
        self.state.related_cursor.reset();
        self.state.detail_scroll = 0;
        info!(game_id = id, "opening details");
        self.load_details(id);
    }

    fn load_details(&mut self, id: i64) {
        self.cancel_scope(TaskScope::Details);
        let catalog = self.services.catalog.clone();
        self.spawn_scoped(TaskScope::Details, async move {
            let result = catalog.fetch_details(id).await;
            AppEvent::DetailsLoaded { id, result }
        });
        self.load_reviews(id);
        self.check_favorite(id);
    }

    fn load_reviews(&mut self, id: i64) {
        let reviews = self.services.reviews.clone();
        self.spawn_scoped(TaskScope::Details, async move {
            let result = reviews.reviews_for(id).await;
            AppEvent::ReviewsLoaded { id, result }
        });
    }

    fn check_favorite(&mut self, id: i64) {
        let favorites = self.services.favorites.clone();
        self.spawn_scoped(TaskScope::Details, async move {
            let result = favorites.is_favorite(id).await;
            AppEvent::FavoriteChecked { id, result }
        });
    }

    fn load_related(&mut self, game: Game) {
        let catalog = self.services.catalog.clone();
        self.spawn_scoped(TaskScope::Details, async move {
            let result = catalog.fetch_related(&game).await;
            AppEvent::RelatedLoaded {
                id: game.id,
                result,
            }
        });
    }

    /// At most one toggle per game is in flight; repeats are ignored until it lands.
    fn toggle_favorite(&mut self, game: Game) {
        if self.pending_toggles.contains(&game.id) {
            self.state
                .set_status(format!("Still updating {}", game.name));
            return;
        }
        let Some(sender) = self.event_sender() else {
            return;
        };
        self.pending_toggles.insert(game.id);
        let favorites = self.services.favorites.clone();
        spawn(deliver(sender, async move {
            let result = favorites.toggle(&game).await;
            AppEvent::FavoriteToggled {
                id: game.id,
                name: game.name,
                result,
            }
        }));
    }

    fn update_search(&mut self) {
        let Some(sender) = self.search_tx.clone() else {
            error!("search_channel_missing");
            return;
        };
        let generation =
            self.debouncer
                .submit(&self.search_query, self.services.catalog.clone(), sender);
        self.searching = !self.search_query.trim().is_empty();
        if !self.searching {
            self.search_results.clear();
        }
        debug!(generation, query = %self.search_query, "search scheduled");
    }

    fn report(&mut self, err: &FetchError, context: &str, default_message: &str) {
        let classification = classify(err, default_message);
        classification.log(context);
        self.show_failure(Some(classification));
    }

    fn show_failure(&mut self, failure: Option<Classification>) {
        if let Some(classification) = failure {
            if classification.is_user_facing() {
                self.state.set_status(classification.message);
            }
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => self.handle_input(event),
            Some(AppEvent::Tick) => {}
            Some(AppEvent::HomeLoaded(result)) => {
                let loaded = result.is_ok();
                let failure = self.home.apply(result, "home rails", "Couldn't load games.");
                self.show_failure(failure);
                if loaded {
                    if let Some(rails) = self.home.value() {
                        let total: usize = rails.iter().map(|(_, games)| games.len()).sum();
                        let count = rails.len();
                        self.state.rail = self.state.rail.min(count.saturating_sub(1));
                        self.state.rail_positions = vec![0; count];
                        self.state
                            .set_status(format!("Loaded {total} games in {count} rails"));
                    }
                }
            }
            Some(AppEvent::GenreLoaded { slug, result }) => {
                if self.genre_slug != Some(slug) {
                    debug!(slug, "dropping stale genre result");
                    return true;
                }
                let failure = self
                    .genre_games
                    .apply(result, "genre games", "Couldn't load this genre.");
                self.show_failure(failure);
                let len = self.genre_games.value().map_or(0, Vec::len);
                self.state.genre_game_cursor.clamp(len);
            }
            Some(AppEvent::DetailsLoaded { id, result }) => {
                if self.detail_id != Some(id) {
                    return true;
                }
                let game = result.as_ref().ok().cloned();
                let failure = self
                    .details
                    .apply(result, "game details", "Couldn't load this game.");
                self.show_failure(failure);
                if let Some(game) = game {
                    self.load_related(game);
                }
            }
            Some(AppEvent::RelatedLoaded { id, result }) => {
                if self.detail_id != Some(id) {
                    return true;
                }
                match result {
                    Ok(games) => {
                        self.related = games;
                        self.state.related_cursor.clamp(self.related.len());
                    }
                    // Related games are a background extra; failures stay in the log.
                    Err(err) => classify(&err, "Couldn't load related games.").log("related games"),
                }
            }
            Some(AppEvent::ReviewsLoaded { id, result }) => {
                if self.detail_id != Some(id) {
                    return true;
                }
                let failure = self.reviews.apply(result, "reviews", "Couldn't load reviews.");
                self.show_failure(failure);
            }
            Some(AppEvent::FavoriteChecked { id, result }) => {
                if self.detail_id != Some(id) {
                    return true;
                }
                match result {
                    Ok(flag) => self.is_favorite = flag,
                    Err(err) => self.report(&err, "favorite status", "Couldn't check favorites."),
                }
            }
            Some(AppEvent::FavoriteToggled { id, name, result }) => {
                self.pending_toggles.remove(&id);
                self.apply_toggle(id, name, result);
            }
            Some(AppEvent::FavoritesLoaded(result)) => {
                let failure = self
                    .favorites
                    .apply(result, "favorites", "Couldn't load favorites.");
                self.show_failure(failure);
                let len = self.favorites.value().map_or(0, Vec::len);
                self.state.favorites_cursor.clamp(len);
            }
            Some(AppEvent::AccountUpdated { action, result }) => match result {
                Ok(Some(profile)) => {
                    self.state
                        .set_status(format!("{action} as {}", profile.username));
                    self.profile = Some(profile);
                    self.favorites.clear();
                    self.refresh_signed_in_views();
                }
                Ok(None) => self.state.set_status("Sign in first"),
                Err(err) => self.report(&err, "account", "Account request failed."),
            },
            Some(AppEvent::ReviewSubmitted { id, result }) => match result {
                Ok(Some(review)) => {
                    self.state
                        .set_status(format!("Review posted ({})", review.rating));
                    if self.detail_id == Some(id) {
                        self.load_reviews(id);
                    }
                }
                Ok(None) => self.state.set_status("Sign in to write reviews"),
                Err(err) => self.report(&err, "review submit", "Couldn't post your review."),
            },
            Some(AppEvent::OwnReviewLoaded { id, result }) => {
                if self.detail_id != Some(id) || self.prompt.is_some() {
                    return true;
                }
                let existing = match result {
                    Ok(review) => review,
                    Err(err) => {
                        // Starting from a blank draft is fine; keep the failure in the log.
                        classify(&err, "Couldn't load your review.").log("own review");
                        None
                    }
                };
                let (body, rating) = existing.map_or((String::new(), 0), |review| {
                    let rating = RATING_LABELS
                        .iter()
                        .position(|label| *label == review.rating)
                        .unwrap_or(0);
                    (review.body, rating)
                });
                self.prompt = Some(TextPrompt::new(
                    PromptKind::Review { game_id: id, rating },
                    &body,
                ));
            }
            None => return false,
        }
        true
    }

    fn apply_toggle(&mut self, id: i64, name: String, result: Result<Option<bool>, FetchError>) {
        match result {
            Ok(Some(flag)) => {
                if self.detail_id == Some(id) {
                    self.is_favorite = flag;
                }
                let message = if flag {
                    format!("Added {name} to favorites")
                } else {
                    format!("Removed {name} from favorites")
                };
                self.state.set_status(message);
                if self.screen == Screen::Favorites {
                    self.load_favorites();
                }
            }
            Ok(None) => self.state.set_status("Sign in to keep favorites"),
            Err(err) => self.report(&err, "favorite toggle", "Couldn't update favorites."),
        }
    }

    fn handle_search_outcome(&mut self, outcome: SearchOutcome) {
        if !self.debouncer.is_current(&outcome) {
            debug!(query = %outcome.query, "dropping stale search result");
            return;
        }
        self.searching = false;
        let loaded = outcome.result.is_ok();
        let failure = self
            .search_results
            .apply(outcome.result, "search", "Search failed.");
        self.show_failure(failure);
        self.state.search_cursor.reset();
        if loaded {
            let count = self.search_results.value().map_or(0, Vec::len);
            self.state
                .set_status(format!("{count} results for \"{}\"", outcome.query));
        }
    }

    fn refresh_signed_in_views(&mut self) {
        if self.screen == Screen::Favorites {
            self.load_favorites();
        }
        if let Some(id) = self.detail_id {
            self.check_favorite(id);
        }
    }

    fn switch_to(&mut self, screen: Screen) {
        let previous = self.screen;
        self.screen = screen;
        if previous != screen {
            self.leave(previous);
        }
        match screen {
            Screen::Genres => {
                let slug = self
                    .genre_slug
                    .or_else(|| GENRES.get(self.state.genre_cursor.index).map(|genre| genre.slug));
                if let Some(slug) = slug {
                    if self.genre_slug != Some(slug) || !self.genre_games.is_loaded() {
                        self.load_genre(slug);
                    }
                }
            }
            Screen::Search if previous != Screen::Search => {
                if self.search_query.trim().is_empty() {
                    self.state.set_status("Type to search the catalog");
                } else {
                    self.update_search();
                }
            }
            Screen::Favorites => {
                if self.profile.is_none() {
                    self.state.set_status("Sign in to see your favorites");
                }
                self.load_favorites();
            }
            Screen::Account if self.profile.is_none() => self
                .state
                .set_status("Press i to sign in or u to create an account"),
            _ => {}
        }
    }

    /// Stop the background work owned by a screen that is no longer shown.
    fn leave(&mut self, screen: Screen) {
        match screen {
            Screen::Details => {
                self.detail_id = None;
                self.cancel_scope(TaskScope::Details);
            }
            Screen::Genres => self.cancel_scope(TaskScope::Genre),
            Screen::Search => {
                self.debouncer.cancel();
                self.searching = false;
            }
            _ => {}
        }
    }

    fn handle_input(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        if self.handle_global_shortcut(&key) {
            return;
        }
        match self.screen {
            Screen::Home => self.handle_home_key(key),
            Screen::Genres => self.handle_genres_key(key),
            Screen::Search => self.handle_search_key(key),
            Screen::Details => self.handle_details_key(key),
            Screen::Favorites => self.handle_favorites_key(key),
            Screen::Account => self.handle_account_key(key),
        }
    }

    fn handle_global_shortcut(&mut self, key: &KeyEvent) -> bool {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return true;
        }
        match key.code {
            KeyCode::Tab => {
                self.switch_to(self.screen.cycle(1));
                true
            }
            KeyCode::BackTab => {
                self.switch_to(self.screen.cycle(-1));
                true
            }
            // Search owns the keyboard for typing.
            _ if self.screen == Screen::Search => false,
            KeyCode::Char('q') if key.modifiers.is_empty() => {
                self.state.should_quit = true;
                true
            }
            KeyCode::Char(ch @ '1'..='5') if key.modifiers.is_empty() => {
                let idx = ch as usize - '1' as usize;
                self.switch_to(NAV_SCREENS[idx]);
                true
            }
            _ => false,
        }
    }

    fn current_rail(&self) -> Option<&(String, Vec<Game>)> {
        self.home.value()?.get(self.state.rail)
    }

    fn selected_home_game(&self) -> Option<&Game> {
        let (_, games) = self.current_rail()?;
        games.get(self.state.rail_position(self.state.rail))
    }

    fn handle_home_key(&mut self, key: KeyEvent) {
        let rail_count = self.home.value().map_or(0, Vec::len);
        let rail_len = self.current_rail().map_or(0, |(_, games)| games.len());
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.move_rail(1, rail_count),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_rail(-1, rail_count),
            KeyCode::Char('l') | KeyCode::Right => self.state.move_in_rail(1, rail_len),
            KeyCode::Char('h') | KeyCode::Left => self.state.move_in_rail(-1, rail_len),
            KeyCode::Char('r') => self.load_home(),
            KeyCode::Enter => {
                if let Some(id) = self.selected_home_game().map(|game| game.id) {
                    self.open_details(id);
                }
            }
            _ => {}
        }
    }

    fn handle_genres_key(&mut self, key: KeyEvent) {
        let games_len = self.genre_games.value().map_or(0, Vec::len);
        match (self.state.genre_focus, key.code) {
            (_, KeyCode::Char('r')) => {
                if let Some(slug) = self.genre_slug {
                    self.load_genre(slug);
                }
            }
            (GenreFocus::List, KeyCode::Char('j') | KeyCode::Down) => {
                self.state.genre_cursor.move_by(1, GENRES.len());
            }
            (GenreFocus::List, KeyCode::Char('k') | KeyCode::Up) => {
                self.state.genre_cursor.move_by(-1, GENRES.len());
            }
            (GenreFocus::List, KeyCode::Enter | KeyCode::Right | KeyCode::Char('l')) => {
                if let Some(genre) = GENRES.get(self.state.genre_cursor.index) {
                    let slug = genre.slug;
                    if self.genre_slug != Some(slug) || !self.genre_games.is_loaded() {
                        self.load_genre(slug);
                    }
                    self.state.genre_focus = GenreFocus::Games;
                }
            }
            (GenreFocus::Games, KeyCode::Esc | KeyCode::Left | KeyCode::Char('h')) => {
                self.state.genre_focus = GenreFocus::List;
            }
            (GenreFocus::Games, KeyCode::Char('j') | KeyCode::Down) => {
                self.state.genre_game_cursor.move_by(1, games_len);
            }
            (GenreFocus::Games, KeyCode::Char('k') | KeyCode::Up) => {
                self.state.genre_game_cursor.move_by(-1, games_len);
            }
            (GenreFocus::Games, KeyCode::Enter) => {
                let selected = self
                    .genre_games
                    .value()
                    .and_then(|games| games.get(self.state.genre_game_cursor.index))
                    .map(|game| game.id);
                if let Some(id) = selected {
                    self.open_details(id);
                }
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let results_len = self.search_results.value().map_or(0, Vec::len);
        match key.code {
            KeyCode::Esc => {
                if self.search_query.is_empty() {
                    self.switch_to(Screen::Home);
                } else {
                    self.search_query.clear();
                    self.update_search();
                }
            }
            KeyCode::Backspace => {
                self.search_query.pop();
                self.update_search();
            }
            KeyCode::Down => self.state.search_cursor.move_by(1, results_len),
            KeyCode::Up => self.state.search_cursor.move_by(-1, results_len),
            KeyCode::Enter => {
                let selected = self
                    .search_results
                    .value()
                    .and_then(|games| games.get(self.state.search_cursor.index))
                    .map(|game| game.id);
                if let Some(id) = selected {
                    self.open_details(id);
                }
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.search_query.chars().count() < MAX_INPUT_LEN {
                    self.search_query.push(ch);
                    self.update_search();
                }
            }
            _ => {}
        }
    }

    fn handle_details_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace => {
                let target = self.return_to;
                self.switch_to(target);
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.detail_scroll = self.state.detail_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.detail_scroll = self.state.detail_scroll.saturating_sub(1);
            }
            KeyCode::Char(']') | KeyCode::Char('l') | KeyCode::Right => {
                self.state.related_cursor.move_by(1, self.related.len());
            }
            KeyCode::Char('[') | KeyCode::Char('h') | KeyCode::Left => {
                self.state.related_cursor.move_by(-1, self.related.len());
            }
            KeyCode::Enter => {
                let selected = self
                    .related
                    .get(self.state.related_cursor.index)
                    .map(|game| game.id);
                if let Some(id) = selected {
                    self.open_details(id);
                }
            }
            KeyCode::Char('f') => match self.details.value().cloned() {
                Some(game) => self.toggle_favorite(game),
                None => self.state.set_status("Still loading this game"),
            },
            KeyCode::Char('w') => self.begin_review(),
            KeyCode::Char('r') => {
                if let Some(id) = self.detail_id {
                    self.load_details(id);
                }
            }
            _ => {}
        }
    }

    fn handle_favorites_key(&mut self, key: KeyEvent) {
        let len = self.favorites.value().map_or(0, Vec::len);
        let selected = self
            .favorites
            .value()
            .and_then(|favorites| favorites.get(self.state.favorites_cursor.index))
            .cloned();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.favorites_cursor.move_by(1, len),
            KeyCode::Char('k') | KeyCode::Up => self.state.favorites_cursor.move_by(-1, len),
            KeyCode::Char('r') => self.load_favorites(),
            KeyCode::Enter => {
                if let Some(favorite) = selected {
                    self.open_details(favorite.id);
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(favorite) = selected {
                    self.toggle_favorite(Game::from(favorite));
                }
            }
            _ => {}
        }
    }

    fn handle_account_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('i') => self.prompt = Some(TextPrompt::new(PromptKind::SignIn, "")),
            KeyCode::Char('u') => {
                self.prompt = Some(TextPrompt::new(PromptKind::SignUpEmail, ""));
            }
            KeyCode::Char('e') => match &self.profile {
                Some(profile) => {
                    self.prompt = Some(TextPrompt::new(PromptKind::Username, &profile.username));
                }
                None => self.state.set_status("Sign in to edit your profile"),
            },
            KeyCode::Char('p') => {
                if self.profile.is_some() {
                    self.prompt = Some(TextPrompt::new(PromptKind::Picture, ""));
                } else {
                    self.state.set_status("Sign in to edit your profile");
                }
            }
            KeyCode::Char('o') => self.sign_out(),
            _ => {}
        }
    }

    fn begin_review(&mut self) {
        let Some(game_id) = self.detail_id else {
            return;
        };
        if self.profile.is_none() {
            self.state.set_status("Sign in to write a review");
            return;
        }
        let reviews = self.services.reviews.clone();
        self.spawn_scoped(TaskScope::Details, async move {
            let result = reviews.own_review(game_id).await;
            AppEvent::OwnReviewLoaded {
                id: game_id,
                result,
            }
        });
    }

    fn sign_out(&mut self) {
        if self.profile.is_none() {
            self.state.set_status("Not signed in");
            return;
        }
        self.services.accounts.sign_out();
        self.profile = None;
        self.favorites.clear();
        self.is_favorite = false;
        self.state.set_status("Signed out");
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                self.state.set_status("Cancelled");
            }
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
            KeyCode::Tab => prompt.cycle_rating(1),
            KeyCode::BackTab => prompt.cycle_rating(-1),
            KeyCode::Left => prompt.move_cursor(-1),
            KeyCode::Right => prompt.move_cursor(1),
            KeyCode::Home => prompt.move_home(),
            KeyCode::End => prompt.move_end(),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                prompt.insert(ch);
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, prompt: TextPrompt) {
        let value = prompt.value();
        if value.is_empty() {
            self.state.set_status("Nothing entered");
            return;
        }
        let accounts = self.services.accounts.clone();
        match prompt.kind {
            PromptKind::SignIn => self.spawn_task(async move {
                AppEvent::AccountUpdated {
                    action: "Signed in",
                    result: accounts.sign_in(&value).await.map(Some),
                }
            }),
            PromptKind::SignUpEmail => {
                self.prompt = Some(TextPrompt::new(
                    PromptKind::SignUpUsername { email: value },
                    "",
                ));
            }
            PromptKind::SignUpUsername { email } => self.spawn_task(async move {
                AppEvent::AccountUpdated {
                    action: "Account created",
                    result: accounts.sign_up(&email, &value).await.map(Some),
                }
            }),
            PromptKind::Username => self.spawn_task(async move {
                AppEvent::AccountUpdated {
                    action: "Username updated",
                    result: accounts.update_username(&value).await,
                }
            }),
            PromptKind::Picture => {
                let path = PathBuf::from(value);
                self.spawn_task(async move {
                    AppEvent::AccountUpdated {
                        action: "Picture updated",
                        result: accounts.update_picture(&path).await,
                    }
                });
            }
            PromptKind::Review { game_id, rating } => {
                let reviews = self.services.reviews.clone();
                let label = RATING_LABELS[rating % RATING_LABELS.len()];
                self.spawn_task(async move {
                    AppEvent::ReviewSubmitted {
                        id: game_id,
                        result: reviews.submit(game_id, &value, label).await,
                    }
                });
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_header(frame, chunks[0]);
        match self.screen {
            Screen::Home => self.draw_home(frame, chunks[1]),
            Screen::Genres => self.draw_genres(frame, chunks[1]),
            Screen::Search => self.draw_search(frame, chunks[1]),
            Screen::Details => self.draw_details(frame, chunks[1]),
            Screen::Favorites => self.draw_favorites(frame, chunks[1]),
            Screen::Account => self.draw_account(frame, chunks[1]),
        }
        self.render_status(frame, chunks[2]);
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
    }

    fn draw_home(&self, frame: &mut Frame, area: Rect) {
        let Some(rails) = self.home.value() else {
            self.render_placeholder(frame, area, "Home", &feed_message(&self.home, "Loading games…"));
            return;
        };
        if rails.is_empty() {
            self.render_placeholder(frame, area, "Home", "No games available");
            return;
        }

        let mut constraints: Vec<Constraint> = rails.iter().map(|_| Constraint::Length(3)).collect();
        constraints.push(Constraint::Min(3));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (idx, (name, games)) in rails.iter().enumerate() {
            self.render_rail(
                frame,
                chunks[idx],
                name,
                games,
                idx == self.state.rail,
                self.state.rail_position(idx),
            );
        }
        if let Some(summary_area) = chunks.last() {
            self.render_game_summary(frame, *summary_area, self.selected_home_game());
        }
    }

    fn draw_genres(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
            .split(area);

        let focused = self.state.genre_focus == GenreFocus::List;
        let items: Vec<ListItem> = GENRES
            .iter()
            .map(|genre| {
                let style = if Some(genre.slug) == self.genre_slug {
                    Style::default().fg(self.theme.accent)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                ListItem::new(Line::from(Span::styled(genre.name, style)))
            })
            .collect();
        let list = List::new(items)
            .block(self.panel("Genres", focused))
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut list_state = self.state.genre_cursor.list_state(GENRES.len());
        frame.render_stateful_widget(list, columns[0], &mut list_state);

        let Some(slug) = self.genre_slug else {
            self.render_placeholder(frame, columns[1], "Games", "Pick a genre");
            return;
        };
        let title = genre_by_slug(slug).map_or(slug, |genre| genre.name);
        match self.genre_games.value() {
            Some(games) if !games.is_empty() => self.render_game_list(
                frame,
                columns[1],
                title,
                game_rows(games),
                self.state.genre_game_cursor,
                !focused,
            ),
            Some(_) => self.render_placeholder(frame, columns[1], title, "No games in this genre"),
            None => self.render_placeholder(
                frame,
                columns[1],
                title,
                &feed_message(&self.genre_games, "Loading games…"),
            ),
        }
    }

    fn draw_search(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let field_width = chunks[0].width.saturating_sub(4) as usize;
        let query_len = self.search_query.chars().count();
        let (visible, cursor) = input_window(&self.search_query, query_len, field_width);
        let input = Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(visible),
        ]))
        .block(self.panel("Search", true));
        frame.render_widget(input, chunks[0]);
        if self.prompt.is_none() {
            frame.set_cursor(chunks[0].x + 3 + cursor as u16, chunks[0].y + 1);
        }

        if self.search_query.trim().is_empty() {
            self.render_placeholder(frame, chunks[1], "Results", "Start typing to search");
            return;
        }
        match self.search_results.value() {
            Some(games) if !games.is_empty() => self.render_game_list(
                frame,
                chunks[1],
                if self.searching { "Results (searching…)" } else { "Results" },
                game_rows(games),
                self.state.search_cursor,
                true,
            ),
            Some(_) if !self.searching => {
                self.render_placeholder(frame, chunks[1], "Results", "No games found")
            }
            _ => self.render_placeholder(
                frame,
                chunks[1],
                "Results",
                &feed_message(&self.search_results, "Searching…"),
            ),
        }
    }

    fn draw_details(&self, frame: &mut Frame, area: Rect) {
        let Some(game) = self.details.value() else {
            self.render_placeholder(
                frame,
                area,
                "Details",
                &feed_message(&self.details, "Loading details…"),
            );
            return;
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let title = if self.is_favorite {
            format!("{} ♥", game.name)
        } else {
            game.name.clone()
        };
        let paragraph = Paragraph::new(self.detail_lines(game))
            .block(self.panel(&title, true))
            .wrap(Wrap { trim: false })
            .scroll((self.state.detail_scroll, 0));
        frame.render_widget(paragraph, columns[0]);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);
        self.render_reviews(frame, side[0]);
        if self.related.is_empty() {
            self.render_placeholder(frame, side[1], "Related", "Nothing related yet");
        } else {
            self.render_game_list(
                frame,
                side[1],
                "Related",
                game_rows(&self.related),
                self.state.related_cursor,
                true,
            );
        }
    }

    fn draw_favorites(&self, frame: &mut Frame, area: Rect) {
        if self.profile.is_none() {
            self.render_placeholder(frame, area, "Favorites", "Sign in to see your favorites");
            return;
        }
        match self.favorites.value() {
            Some(favorites) if !favorites.is_empty() => {
                let rows = favorites
                    .iter()
                    .map(|favorite| (favorite.name.clone(), favorite.rating))
                    .collect();
                self.render_game_list(
                    frame,
                    area,
                    "Favorites",
                    rows,
                    self.state.favorites_cursor,
                    true,
                );
            }
            Some(_) => self.render_placeholder(
                frame,
                area,
                "Favorites",
                "No favorites yet. Press f on a game to add one.",
            ),
            None => self.render_placeholder(
                frame,
                area,
                "Favorites",
                &feed_message(&self.favorites, "Loading favorites…"),
            ),
        }
    }

    fn draw_account(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        match &self.profile {
            Some(profile) => {
                lines.push(Line::from(Span::styled(
                    profile.username.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                if let Some(user) = self.services.accounts.session().current() {
                    lines.push(Line::from(format!("Email: {}", user.email)));
                }
                lines.push(Line::from(format!(
                    "Picture: {}",
                    profile.profile_picture.as_deref().unwrap_or("none")
                )));
                lines.push(Line::from(""));
                lines.push(Line::from("e  change username"));
                lines.push(Line::from("p  set profile picture"));
                lines.push(Line::from("o  sign out"));
            }
            None => {
                lines.push(Line::from(Span::styled(
                    "Not signed in",
                    Style::default().fg(self.theme.muted),
                )));
                lines.push(Line::from(""));
                lines.push(Line::from("i  sign in"));
                lines.push(Line::from("u  create an account"));
            }
        }
        let paragraph = Paragraph::new(lines)
            .block(self.panel("Account", true))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn detail_lines(&self, game: &Game) -> Vec<Line<'static>> {
        let heading = Style::default()
            .fg(self.theme.accent)
            .add_modifier(Modifier::BOLD);
        let muted = Style::default().fg(self.theme.muted);
        let mut lines = Vec::new();

        lines.push(Line::from(vec![
            Span::styled(format_rating(game.rating), Style::default().fg(self.theme.success)),
            Span::styled(format!("  {}", game.genre_names()), muted),
        ]));
        if let Some(platforms) = &game.platforms {
            let names: Vec<&str> = platforms
                .iter()
                .map(|entry| entry.platform.name.as_str())
                .collect();
            lines.push(Line::from(Span::styled(names.join(", "), muted)));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("About", heading)));
        match game.plain_description() {
            Some(text) => lines.extend(text.lines().map(|line| Line::from(line.to_string()))),
            None => lines.push(Line::from(Span::styled("No description available.", muted))),
        }

        let requirements = game.requirements();
        if !requirements.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("System requirements", heading)));
            for entry in requirements {
                lines.push(Line::from(Span::styled(
                    entry.platform.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                if let Some(block) = entry.requirement_block() {
                    if let Some(minimum) = &block.minimum {
                        lines.extend(minimum.lines().map(|line| Line::from(line.to_string())));
                    }
                    if let Some(recommended) = &block.recommended {
                        lines.extend(recommended.lines().map(|line| Line::from(line.to_string())));
                    }
                }
            }
        }

        let screenshots = game.screenshots.as_deref().unwrap_or_default();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Screenshots ({})", screenshots.len()),
            heading,
        )));
        for shot in screenshots {
            lines.push(Line::from(Span::styled(shot.image.clone(), muted)));
        }
        lines
    }

    fn render_reviews(&self, frame: &mut Frame, area: Rect) {
        let Some(reviews) = self.reviews.value() else {
            self.render_placeholder(
                frame,
                area,
                "Reviews",
                &feed_message(&self.reviews, "Loading reviews…"),
            );
            return;
        };
        if reviews.is_empty() {
            self.render_placeholder(frame, area, "Reviews", "No reviews yet. Press w to write one.");
            return;
        }
        let mut lines = Vec::new();
        for review in reviews {
            lines.push(Line::from(vec![
                Span::styled(
                    review.reviewer_name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        " · {} · {}",
                        review.rating,
                        review.updated_at.with_timezone(&Local).format("%Y-%m-%d")
                    ),
                    Style::default().fg(self.theme.muted),
                ),
            ]));
            lines.push(Line::from(review.body.clone()));
            lines.push(Line::from(""));
        }
        let paragraph = Paragraph::new(lines)
            .block(self.panel(&format!("Reviews ({})", reviews.len()), false))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let active = if self.screen == Screen::Details {
            self.return_to
        } else {
            self.screen
        };
        let mut spans: Vec<Span> = NAV_SCREENS
            .iter()
            .enumerate()
            .map(|(idx, screen)| {
                let label = format!(" {} {} ", idx + 1, screen.title());
                if *screen == active {
                    Span::styled(
                        label,
                        Style::default()
                            .fg(self.theme.on_accent)
                            .bg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::styled(label, Style::default().fg(self.theme.primary_fg))
                }
            })
            .collect();
        let user = match &self.profile {
            Some(profile) => format!("   signed in as {}", profile.username),
            None => "   not signed in".to_string(),
        };
        spans.push(Span::styled(user, Style::default().fg(self.theme.muted)));
        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Ludex"));
        frame.render_widget(header, area);
    }

    fn render_rail(
        &self,
        frame: &mut Frame,
        area: Rect,
        name: &str,
        games: &[Game],
        focused: bool,
        position: usize,
    ) {
        let title = format!("{name} ({})", games.len());
        let block = self.panel(&title, focused);
        if games.is_empty() {
            let paragraph = Paragraph::new(Span::styled(
                "Nothing here yet",
                Style::default().fg(self.theme.muted),
            ))
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let inner_width = area.width.saturating_sub(2) as usize;
        let visible = (inner_width / RAIL_ITEM_WIDTH).max(1);
        let item_width = (inner_width / visible).max(1);
        let start = window_start(position, visible, games.len());
        let spans: Vec<Span> = games
            .iter()
            .enumerate()
            .skip(start)
            .take(visible)
            .map(|(idx, game)| {
                let label = format!(
                    "{:<width$}",
                    truncate(&game.name, item_width.saturating_sub(1)),
                    width = item_width
                );
                let style = if idx != position {
                    Style::default().fg(self.theme.primary_fg)
                } else if focused {
                    Style::default()
                        .fg(self.theme.on_accent)
                        .bg(self.theme.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.accent)
                };
                Span::styled(label, style)
            })
            .collect();
        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }

    fn render_game_summary(&self, frame: &mut Frame, area: Rect, game: Option<&Game>) {
        let Some(game) = game else {
            self.render_placeholder(frame, area, "Selected", "Nothing selected");
            return;
        };
        let lines = vec![
            Line::from(Span::styled(
                game.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(format_rating(game.rating), Style::default().fg(self.theme.success)),
                Span::styled(
                    format!("  {}", game.genre_names()),
                    Style::default().fg(self.theme.muted),
                ),
            ]),
        ];
        let paragraph = Paragraph::new(lines)
            .block(self.panel("Selected", false))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_game_list(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        rows: Vec<(String, Option<f64>)>,
        cursor: ListCursor,
        focused: bool,
    ) {
        let len = rows.len();
        let items: Vec<ListItem> = rows
            .into_iter()
            .map(|(name, rating)| {
                ListItem::new(Line::from(vec![
                    Span::styled(name, Style::default().fg(self.theme.primary_fg)),
                    Span::styled(
                        format!("  {}", format_rating(rating)),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(self.panel(title, focused))
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut list_state = if focused {
            cursor.list_state(len)
        } else {
            ListState::default()
        };
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_placeholder(&self, frame: &mut Frame, area: Rect, title: &str, message: &str) {
        let paragraph = Paragraph::new(Span::styled(
            message.to_string(),
            Style::default().fg(self.theme.muted),
        ))
        .block(self.panel(title, false))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &TextPrompt) {
        let frame_area = frame.size();
        let width = 64_u16.min(frame_area.width.saturating_sub(4)).max(24);
        let height = 8_u16.min(frame_area.height.saturating_sub(2)).max(6);
        let area = centered_rect(width, height, frame_area);
        frame.render_widget(Clear, area);

        let field_width = area.width.saturating_sub(5) as usize;
        let (visible, cursor) = input_window(&prompt.input, prompt.cursor, field_width);
        let mut lines = vec![
            Line::from(prompt.kind.instruction()),
            Line::from(vec![
                Span::styled("> ", Style::default().fg(self.theme.accent)),
                Span::raw(visible),
            ]),
        ];
        if let PromptKind::Review { rating, .. } = &prompt.kind {
            let spans: Vec<Span> = RATING_LABELS
                .iter()
                .enumerate()
                .map(|(idx, label)| {
                    if idx == *rating {
                        Span::styled(
                            format!("[{label}] "),
                            Style::default()
                                .fg(self.theme.accent)
                                .add_modifier(Modifier::BOLD),
                        )
                    } else {
                        Span::styled(format!(" {label}  "), Style::default().fg(self.theme.muted))
                    }
                })
                .collect();
            lines.push(Line::from(spans));
        } else {
            lines.push(Line::from(""));
        }
        let mut helper = vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" submit  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ];
        if matches!(prompt.kind, PromptKind::Review { .. }) {
            helper.push(Span::raw("  "));
            helper.push(Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)));
            helper.push(Span::raw(" rating"));
        }
        lines.push(Line::from(helper));

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.accent))
                    .title(prompt.kind.title()),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        let cursor_x = (area.x + 3 + cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 2);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let hints = match self.screen {
            Screen::Home => "↑↓ rail  ←→ game  Enter open  r reload  Tab screens  q quit",
            Screen::Genres => "↑↓ move  Enter open  ← genres  r reload  Tab screens  q quit",
            Screen::Search => "type to search  ↑↓ move  Enter open  Esc clear  Tab screens",
            Screen::Details => "↑↓ scroll  [ ] related  Enter open related  f favorite  w review  Esc back",
            Screen::Favorites => "↑↓ move  Enter open  x remove  r reload  Tab screens  q quit",
            Screen::Account => "i sign in  u sign up  e username  p picture  o sign out",
        };
        let status_style = if self.state.status.starts_with("Error") {
            Style::default().fg(self.theme.danger)
        } else {
            Style::default().fg(self.theme.primary_fg)
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(self.state.status.clone(), status_style)),
            Line::from(Span::styled(hints, Style::default().fg(self.theme.muted))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn panel(&self, title: &str, focused: bool) -> Block<'static> {
        let border = if focused {
            self.theme.accent
        } else {
            self.theme.muted
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title.to_string())
    }
}

async fn deliver<F>(sender: mpsc::Sender<AppEvent>, task: F)
where
    F: Future<Output = AppEvent>,
{
    let event = task.await;
    let _ = sender.send(event).await;
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    status: String,
    should_quit: bool,
    rail: usize,
    rail_positions: Vec<usize>,
    genre_focus: GenreFocus,
    genre_cursor: ListCursor,
    genre_game_cursor: ListCursor,
    search_cursor: ListCursor,
    related_cursor: ListCursor,
    favorites_cursor: ListCursor,
    detail_scroll: u16,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: "Ready".to_string(),
            should_quit: false,
            rail: 0,
            rail_positions: Vec::new(),
            genre_focus: GenreFocus::List,
            genre_cursor: ListCursor::default(),
            genre_game_cursor: ListCursor::default(),
            search_cursor: ListCursor::default(),
            related_cursor: ListCursor::default(),
            favorites_cursor: ListCursor::default(),
            detail_scroll: 0,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn move_rail(&mut self, delta: isize, rails: usize) {
        let mut cursor = ListCursor { index: self.rail };
        cursor.move_by(delta, rails);
        self.rail = cursor.index;
    }

    fn rail_position(&self, rail: usize) -> usize {
        self.rail_positions.get(rail).copied().unwrap_or(0)
    }

    fn move_in_rail(&mut self, delta: isize, len: usize) {
        if self.rail_positions.len() <= self.rail {
            self.rail_positions.resize(self.rail + 1, 0);
        }
        let mut cursor = ListCursor {
            index: self.rail_positions[self.rail],
        };
        cursor.move_by(delta, len);
        self.rail_positions[self.rail] = cursor.index;
    }
}

fn feed_message<T>(cell: &FeedCell<T>, loading: &str) -> String {
    cell.last_error()
        .map(|classification| classification.message.clone())
        .unwrap_or_else(|| loading.to_string())
}

fn game_rows(games: &[Game]) -> Vec<(String, Option<f64>)> {
    games
        .iter()
        .map(|game| (game.name.clone(), game.rating))
        .collect()
}

fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(value) if value > 0.0 => format!("★ {value:.1}"),
        _ => "unrated".to_string(),
    }
}

/// First index of a window of `visible` items that keeps `selected` in view.
fn window_start(selected: usize, visible: usize, len: usize) -> usize {
    if visible == 0 || len <= visible {
        return 0;
    }
    selected.saturating_sub(visible / 2).min(len - visible)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

/// Slice of `input` that fits `width` columns with the cursor visible, plus
/// the cursor offset inside that slice.
fn input_window(input: &str, cursor: usize, width: usize) -> (String, usize) {
    let width = width.max(1);
    let start = cursor.saturating_sub(width - 1);
    let visible: String = input.chars().skip(start).take(width).collect();
    (visible, cursor - start)
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
