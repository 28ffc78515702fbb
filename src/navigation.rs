use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

/// Navigable destinations. The set is closed; `Overview` is the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Screen {
    Overview,
    SwitchAccount,
    ManageKeystores,
    FlashQrCode,
    Settings,
    About,
}

impl Screen {
    pub const ROOT: Screen = Screen::Overview;

    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Overview => "overview",
            Screen::SwitchAccount => "switch_account",
            Screen::ManageKeystores => "manage_keystores",
            Screen::FlashQrCode => "flashqrcode",
            Screen::Settings => "settings_screen",
            Screen::About => "about",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Screen {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(Screen::Overview),
            "switch_account" => Ok(Screen::SwitchAccount),
            "manage_keystores" => Ok(Screen::ManageKeystores),
            "flashqrcode" => Ok(Screen::FlashQrCode),
            "settings_screen" => Ok(Screen::Settings),
            "about" => Ok(Screen::About),
            other => Err(anyhow!("Unknown screen: {other}")),
        }
    }
}

/// Tabs of the overview screen's bottom navigation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverviewTab {
    #[default]
    Overview,
    Send,
    Receive,
    History,
}

/// Tabs of the manage keystores screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeystoreTab {
    #[default]
    ManageExisting,
    CreateNewAccount,
    ImportKeystore,
}

/// Slide direction of a screen transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// What the host should do with a back key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackKey {
    Consumed,
    /// Nothing left to go back to; let the host handle it (usually exit).
    Propagate,
}

#[derive(Clone, Debug)]
pub struct NavigationStack {
    current: Screen,
    history: Vec<Screen>,
    direction: Option<Direction>,
    overview_tab: OverviewTab,
    keystore_tab: KeystoreTab,
}

impl Default for NavigationStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStack {
    pub fn new() -> Self {
        Self {
            current: Screen::ROOT,
            history: Vec::new(),
            direction: None,
            overview_tab: OverviewTab::default(),
            keystore_tab: KeystoreTab::default(),
        }
    }

    /// Restores a stack from a saved history, e.g. after a restart.
    pub fn from_history(current: Screen, history: Vec<Screen>) -> Self {
        Self {
            current,
            history,
            ..Self::new()
        }
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    pub fn history(&self) -> &[Screen] {
        &self.history
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn overview_tab(&self) -> OverviewTab {
        self.overview_tab
    }

    pub fn keystore_tab(&self) -> KeystoreTab {
        self.keystore_tab
    }

    pub fn select_overview_tab(&mut self, tab: OverviewTab) {
        self.overview_tab = tab;
    }

    pub fn select_keystore_tab(&mut self, tab: KeystoreTab) {
        self.keystore_tab = tab;
    }

    pub fn go(&mut self, screen: Screen) {
        self.go_with(screen, None, true);
    }

    pub fn go_with(&mut self, screen: Screen, direction: Option<Direction>, record_history: bool) {
        if direction.is_some() {
            self.direction = direction;
        }
        self.current = screen;
        // dwelling on a screen must not make back look like a no-op
        if record_history && self.history.last() != Some(&screen) {
            self.history.push(screen);
        }
        if screen == Screen::ROOT {
            self.history.clear();
        }
        log::debug!("Navigated to {screen}, history depth {}", self.history.len());
    }

    /// Drops the current screen and shows the one below it without
    /// re-recording it. Falls back to the root when nothing is below.
    pub fn back(&mut self) -> Screen {
        self.history.pop();
        let previous = self.history.last().copied().unwrap_or(Screen::ROOT);
        self.go_with(previous, Some(Direction::Right), false);
        previous
    }

    pub fn handle_back_key(&mut self) -> BackKey {
        if self.current == Screen::Overview {
            if self.overview_tab != OverviewTab::Overview {
                self.overview_tab = OverviewTab::Overview;
                return BackKey::Consumed;
            }
            return BackKey::Propagate;
        }
        self.back();
        BackKey::Consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_go_records_once() {
        let mut nav = NavigationStack::new();
        nav.go(Screen::About);
        nav.go(Screen::About);
        nav.go(Screen::About);
        assert_eq!(nav.history(), &[Screen::About]);
    }

    #[test]
    fn root_clears_history() {
        let mut nav = NavigationStack::new();
        nav.go(Screen::SwitchAccount);
        nav.go(Screen::Settings);
        nav.go(Screen::Overview);
        assert!(nav.history().is_empty());
        assert_eq!(nav.current(), Screen::Overview);
    }

    #[test]
    fn back_walks_down_to_root() {
        let mut nav = NavigationStack::from_history(
            Screen::Settings,
            vec![Screen::Overview, Screen::SwitchAccount, Screen::Settings],
        );

        assert_eq!(nav.back(), Screen::SwitchAccount);
        assert_eq!(nav.history(), &[Screen::Overview, Screen::SwitchAccount]);

        assert_eq!(nav.back(), Screen::Overview);
        assert!(nav.history().is_empty());

        assert_eq!(nav.back(), Screen::Overview);
        assert!(nav.history().is_empty());
        assert_eq!(nav.current(), Screen::Overview);
    }

    #[test]
    fn back_with_single_entry_goes_to_root() {
        let mut nav = NavigationStack::new();
        nav.go(Screen::About);
        assert_eq!(nav.back(), Screen::Overview);
        assert!(nav.history().is_empty());
        assert_eq!(nav.direction(), Some(Direction::Right));
    }

    #[test]
    fn unrecorded_move_leaves_history() {
        let mut nav = NavigationStack::new();
        nav.go(Screen::Settings);
        nav.go_with(Screen::About, Some(Direction::Left), false);
        assert_eq!(nav.current(), Screen::About);
        assert_eq!(nav.history(), &[Screen::Settings]);
        assert_eq!(nav.direction(), Some(Direction::Left));
    }

    #[test]
    fn back_key_returns_to_overview_tab_first() {
        let mut nav = NavigationStack::new();
        nav.select_overview_tab(OverviewTab::History);

        assert_eq!(nav.handle_back_key(), BackKey::Consumed);
        assert_eq!(nav.overview_tab(), OverviewTab::Overview);
        assert_eq!(nav.handle_back_key(), BackKey::Propagate);
    }

    #[test]
    fn back_key_elsewhere_goes_back() {
        let mut nav = NavigationStack::new();
        nav.go(Screen::SwitchAccount);
        nav.go(Screen::About);

        assert_eq!(nav.handle_back_key(), BackKey::Consumed);
        assert_eq!(nav.current(), Screen::SwitchAccount);
    }

    #[test]
    fn screen_names_round_trip() {
        for screen in [
            Screen::Overview,
            Screen::SwitchAccount,
            Screen::ManageKeystores,
            Screen::FlashQrCode,
            Screen::Settings,
            Screen::About,
        ] {
            assert_eq!(screen.as_str().parse::<Screen>().unwrap(), screen);
        }
        assert!("nowhere".parse::<Screen>().is_err());
    }
}
