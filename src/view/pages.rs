//! Guard level and collections of every page on the site.

use super::{Guard, Route, ViewSpec};
use crate::loader::CollectionName;

pub const HOME: ViewSpec = ViewSpec {
    route: Route::Home,
    guard: Guard::Public,
    collections: &[],
};

pub const LOGIN: ViewSpec = ViewSpec {
    route: Route::Login,
    guard: Guard::Public,
    collections: &[],
};

pub const REGISTER: ViewSpec = ViewSpec {
    route: Route::Register,
    guard: Guard::Public,
    collections: &[],
};

pub const FORUM: ViewSpec = ViewSpec {
    route: Route::Forum,
    guard: Guard::Public,
    collections: &[CollectionName::Posts],
};

pub const FACTIONS: ViewSpec = ViewSpec {
    route: Route::Factions,
    guard: Guard::Public,
    collections: &[CollectionName::Factions],
};

pub const PROFILE: ViewSpec = ViewSpec {
    route: Route::Profile,
    guard: Guard::Authenticated,
    collections: &[],
};

pub const ADMIN: ViewSpec = ViewSpec {
    route: Route::Admin,
    guard: Guard::Admin,
    collections: &[
        CollectionName::Users,
        CollectionName::Factions,
        CollectionName::Statistics,
    ],
};

/// Page definition for a route.
pub fn for_route(route: Route) -> &'static ViewSpec {
    match route {
        Route::Home => &HOME,
        Route::Login => &LOGIN,
        Route::Register => &REGISTER,
        Route::Forum => &FORUM,
        Route::Factions => &FACTIONS,
        Route::Profile => &PROFILE,
        Route::Admin => &ADMIN,
    }
}
