//! Role-based router: which screen group a front end should mount.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pure derivation from session state; holds nothing of its own. Front ends
//! re-run [`select_screen_group`] on every [`crate::SessionStore::subscribe`]
//! notification.

use serde::Serialize;

use crate::api::types::Role;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenGroup {
    /// Hydration or login in flight with nothing cached; show a spinner only.
    Loading,
    Unauthenticated,
    Admin,
    /// Any authenticated non-admin user.
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Login,
    SignUp,
    Dashboard,
    Activities,
    ActivityDetail,
    Enrollments,
    Ranking,
    Profile,
    EditProfile,
    AdminActivities,
    AdminUsers,
    AdminOngs,
    AdminEnrollments,
    ActivityEdit,
}

const UNAUTHENTICATED_SCREENS: &[Screen] = &[Screen::Login, Screen::SignUp];

const MEMBER_SCREENS: &[Screen] = &[
    Screen::Dashboard,
    Screen::Activities,
    Screen::Enrollments,
    Screen::Ranking,
    Screen::ActivityDetail,
    Screen::Profile,
    Screen::EditProfile,
];

const ADMIN_SCREENS: &[Screen] = &[
    Screen::AdminActivities,
    Screen::AdminUsers,
    Screen::AdminOngs,
    Screen::AdminEnrollments,
    Screen::ActivityEdit,
    Screen::Profile,
    Screen::EditProfile,
];

impl ScreenGroup {
    /// Screens mounted by this group, tabs first.
    #[must_use]
    pub fn screens(self) -> &'static [Screen] {
        match self {
            Self::Loading => &[],
            Self::Unauthenticated => UNAUTHENTICATED_SCREENS,
            Self::Admin => ADMIN_SCREENS,
            Self::Member => MEMBER_SCREENS,
        }
    }

    #[must_use]
    pub fn initial_screen(self) -> Option<Screen> {
        self.screens().first().copied()
    }
}

/// Pick the screen group for `{is_authenticated, is_loading, role}`.
///
/// `role` is `None` when no user is cached.
#[must_use]
pub fn route(is_authenticated: bool, is_loading: bool, role: Option<Role>) -> ScreenGroup {
    if is_loading && role.is_none() {
        return ScreenGroup::Loading;
    }
    if !is_authenticated {
        return ScreenGroup::Unauthenticated;
    }
    match role {
        Some(Role::Admin) => ScreenGroup::Admin,
        Some(_) => ScreenGroup::Member,
        // Authenticated implies a cached profile; without one, fall back to login.
        None => ScreenGroup::Unauthenticated,
    }
}

#[must_use]
pub fn select_screen_group(state: &SessionState) -> ScreenGroup {
    route(state.is_authenticated, state.is_loading, state.role())
}

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;
