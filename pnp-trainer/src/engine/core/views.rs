//! Window-to-view routing.
//!
//! Each window is registered once with the view that owns its input. The
//! dispatch system drains Bevy's window events every frame and forwards
//! them to that view with the session locked for the whole batch.

use std::collections::HashMap;

use bevy::input::ButtonState;
use bevy::input::keyboard::KeyboardInput;
use bevy::input::mouse::{MouseButtonInput, MouseWheel};
use bevy::prelude::*;
use bevy::window::{CursorMoved, WindowResized};

use super::session::{SessionState, SharedSession};
use crate::tools::matcher::MatcherView;
use crate::tools::viewer::ViewerView;

/// Modifier keys held while a button or key event arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn from_keys(keys: &ButtonInput<KeyCode>) -> Self {
        Self {
            ctrl: keys.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]),
            shift: keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]),
        }
    }
}

/// Input callbacks of one window. Positions are logical pixels with the
/// origin at the window's top-left corner.
pub trait ViewInput {
    fn on_cursor(&mut self, session: &mut SessionState, position: Vec2);

    fn on_button(
        &mut self,
        session: &mut SessionState,
        button: MouseButton,
        pressed: bool,
        modifiers: Modifiers,
    );

    fn on_scroll(&mut self, session: &mut SessionState, delta: Vec2);

    /// Commit, undo and save are accepted from every window.
    fn on_key(&mut self, session: &mut SessionState, key: KeyCode, modifiers: Modifiers) {
        session.handle_shortcut(key, modifiers);
    }

    fn on_resize(&mut self, size: Vec2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Viewer,
    Matcher,
}

/// Which view owns each window.
#[derive(Resource, Debug, Default)]
pub struct ViewRegistry {
    windows: HashMap<Entity, ViewKind>,
}

impl ViewRegistry {
    pub fn register(&mut self, window: Entity, kind: ViewKind) {
        self.windows.insert(window, kind);
    }

    pub fn kind(&self, window: Entity) -> Option<ViewKind> {
        self.windows.get(&window).copied()
    }

    pub fn window(&self, kind: ViewKind) -> Option<Entity> {
        self.windows
            .iter()
            .find_map(|(&entity, &k)| (k == kind).then_some(entity))
    }

    /// The view handling events of `window`, if it is registered.
    pub fn view<'a>(
        &self,
        window: Entity,
        viewer: &'a mut ViewerView,
        matcher: &'a mut MatcherView,
    ) -> Option<&'a mut dyn ViewInput> {
        match self.kind(window)? {
            ViewKind::Viewer => Some(viewer),
            ViewKind::Matcher => Some(matcher),
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn dispatch_view_input(
    registry: Res<ViewRegistry>,
    session: Res<SharedSession>,
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mut viewer: ResMut<ViewerView>,
    mut matcher: ResMut<MatcherView>,
    mut resized: EventReader<WindowResized>,
    mut cursor: EventReader<CursorMoved>,
    mut buttons: EventReader<MouseButtonInput>,
    mut wheel: EventReader<MouseWheel>,
    mut keyboard: EventReader<KeyboardInput>,
) {
    let modifiers = Modifiers::from_keys(&keys);
    let mut guard = session.lock();
    let state = &mut *guard;
    state.now = time.elapsed();
    state.status.expire(state.now);

    let viewer = &mut *viewer;
    let matcher = &mut *matcher;

    for event in resized.read() {
        if let Some(view) = registry.view(event.window, viewer, matcher) {
            view.on_resize(Vec2::new(event.width, event.height));
        }
    }
    for event in cursor.read() {
        if let Some(view) = registry.view(event.window, viewer, matcher) {
            view.on_cursor(state, event.position);
        }
    }
    for event in buttons.read() {
        if let Some(view) = registry.view(event.window, viewer, matcher) {
            let pressed = event.state == ButtonState::Pressed;
            view.on_button(state, event.button, pressed, modifiers);
        }
    }
    for event in wheel.read() {
        if let Some(view) = registry.view(event.window, viewer, matcher) {
            view.on_scroll(state, Vec2::new(event.x, event.y));
        }
    }
    for event in keyboard.read() {
        if event.state != ButtonState::Pressed || event.repeat {
            continue;
        }
        if let Some(view) = registry.view(event.window, viewer, matcher) {
            view.on_key(state, event.key_code, modifiers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_accept_either_side() {
        let mut keys = ButtonInput::<KeyCode>::default();
        assert_eq!(Modifiers::from_keys(&keys), Modifiers::default());

        keys.press(KeyCode::ControlRight);
        keys.press(KeyCode::ShiftLeft);
        assert_eq!(
            Modifiers::from_keys(&keys),
            Modifiers {
                ctrl: true,
                shift: true
            }
        );
    }

    #[test]
    fn registry_maps_both_directions() {
        let mut registry = ViewRegistry::default();
        let viewer = Entity::from_raw(3);
        let matcher = Entity::from_raw(7);
        registry.register(viewer, ViewKind::Viewer);
        registry.register(matcher, ViewKind::Matcher);

        assert_eq!(registry.kind(viewer), Some(ViewKind::Viewer));
        assert_eq!(registry.kind(Entity::from_raw(11)), None);
        assert_eq!(registry.window(ViewKind::Matcher), Some(matcher));
    }
}
