use feed::{FetchOpts, FieldErrors, Vehicle, VehiclesResponse};
use serde::Serialize;

use crate::map::VehicleMap;
use crate::render::{Loader, RenderBridge};

/// Error key used for failures that are not tied to a single field.
pub const MAIN_ERROR: &str = "main";

/// Everything the page shows about the current poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub fetch_opts: FetchOpts,
    pub vehicles: Vec<Vehicle>,
    pub errors: Option<FieldErrors>,
    pub loading: bool,
}

/// A partial update to [`ViewState`]. `None` leaves a field untouched.
///
/// `errors` is doubly optional so a patch can clear errors
/// (`Some(None)`) as well as leave them alone (`None`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewStatePatch {
    pub fetch_opts: Option<FetchOpts>,
    pub vehicles: Option<Vec<Vehicle>>,
    pub errors: Option<Option<FieldErrors>>,
    pub loading: Option<bool>,
}

impl ViewStatePatch {
    pub fn loading(loading: bool) -> Self {
        Self {
            loading: Some(loading),
            ..Self::default()
        }
    }

    pub fn fetch_opts(fetch_opts: FetchOpts) -> Self {
        Self {
            fetch_opts: Some(fetch_opts),
            ..Self::default()
        }
    }

    /// Result of a successful fetch: vehicles and errors both replaced, so
    /// a response without errors clears earlier ones.
    pub fn fetched(response: VehiclesResponse) -> Self {
        Self {
            vehicles: Some(response.vehicles),
            errors: Some(response.errors),
            ..Self::default()
        }
    }

    /// Result of a failed fetch. Vehicles are kept as they were.
    pub fn failed(message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(MAIN_ERROR.to_string(), message.into());
        Self {
            errors: Some(Some(errors)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fetch_opts.is_none()
            && self.vehicles.is_none()
            && self.errors.is_none()
            && self.loading.is_none()
    }
}

/// Apply `patch` to `state`. Each present field replaces the old value
/// wholesale; nothing is merged element-wise.
pub fn reduce(state: ViewState, patch: ViewStatePatch) -> ViewState {
    ViewState {
        fetch_opts: patch.fetch_opts.unwrap_or(state.fetch_opts),
        vehicles: patch.vehicles.unwrap_or(state.vehicles),
        errors: patch.errors.unwrap_or(state.errors),
        loading: patch.loading.unwrap_or(state.loading),
    }
}

/// Sole owner of the [`ViewState`]. Every mutation goes through
/// [`merge_and_render`](Self::merge_and_render).
pub struct ViewStore<M, L> {
    state: ViewState,
    bridge: RenderBridge<M, L>,
}

impl<M: VehicleMap, L: Loader> ViewStore<M, L> {
    pub fn new(bridge: RenderBridge<M, L>) -> Self {
        Self {
            state: ViewState::default(),
            bridge,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn map(&self) -> &M {
        self.bridge.map()
    }

    pub fn bridge(&self) -> &RenderBridge<M, L> {
        &self.bridge
    }

    /// Merge `patch` into the state and render synchronously.
    pub fn merge_and_render(&mut self, patch: ViewStatePatch) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, patch);
        self.bridge.render(&self.state);
    }

    pub fn into_state(self) -> ViewState {
        self.state
    }
}
