use crate::map::VehicleMap;
use crate::state::ViewState;

/// Loading indicator shown while a slow fetch is pending.
pub trait Loader {
    fn show(&mut self);
    fn hide(&mut self);
}

/// Pushes every new [`ViewState`] out to the loader and the map.
///
/// No diffing happens here: both collaborators are called on every render and
/// are expected to be idempotent.
pub struct RenderBridge<M, L> {
    map: M,
    loader: L,
}

impl<M: VehicleMap, L: Loader> RenderBridge<M, L> {
    pub fn new(map: M, loader: L) -> Self {
        Self { map, loader }
    }

    pub fn render(&mut self, state: &ViewState) {
        if state.loading {
            self.loader.show();
        } else {
            self.loader.hide();
        }
        self.map.set_vehicles(&state.vehicles);
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::{Loader, RenderBridge};
    use crate::map::VehicleMap;
    use crate::state::ViewState;
    use feed::Vehicle;
    use foundation::Coordinate;
    use serde_json::json;

    #[derive(Default)]
    struct Journal {
        calls: Vec<String>,
    }

    struct JournalMap(Journal);

    impl VehicleMap for JournalMap {
        fn zoom(&self) -> f64 {
            12.0
        }

        fn bounds(&self, _multiplier: f64) -> Vec<Coordinate> {
            Vec::new()
        }

        fn set_vehicles(&mut self, vehicles: &[Vehicle]) {
            self.0.calls.push(format!("set_vehicles({})", vehicles.len()));
        }
    }

    struct JournalLoader(Journal);

    impl Loader for JournalLoader {
        fn show(&mut self) {
            self.0.calls.push("show".to_string());
        }

        fn hide(&mut self) {
            self.0.calls.push("hide".to_string());
        }
    }

    fn bridge() -> RenderBridge<JournalMap, JournalLoader> {
        RenderBridge::new(
            JournalMap(Journal::default()),
            JournalLoader(Journal::default()),
        )
    }

    #[test]
    fn loading_state_shows_loader() {
        let mut b = bridge();
        b.render(&ViewState {
            loading: true,
            ..ViewState::default()
        });
        assert_eq!(b.loader().0.calls, vec!["show"]);
    }

    #[test]
    fn idle_state_hides_loader() {
        let mut b = bridge();
        b.render(&ViewState::default());
        assert_eq!(b.loader().0.calls, vec!["hide"]);
    }

    #[test]
    fn vehicles_forwarded_even_when_unchanged() {
        let mut b = bridge();
        let state = ViewState {
            vehicles: vec![Vehicle::new(json!({ "id": 1 }))],
            ..ViewState::default()
        };
        b.render(&state);
        b.render(&state);
        assert_eq!(
            b.map().0.calls,
            vec!["set_vehicles(1)", "set_vehicles(1)"]
        );
    }
}
