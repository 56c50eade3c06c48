//! Text drawn on top of both windows: the fading status line, a key
//! reminder, and the anchor caption over the matcher inset.

use bevy::prelude::*;
use bevy::ui::UiTargetCamera;
use constants::status::{HINT_COLOUR, HINT_FONT_SIZE, STATUS_FONT_SIZE};

use super::session::SharedSession;

/// Status line of one window. Every window shows the same message.
#[derive(Component)]
pub struct StatusText;

/// Original coordinates of the anchor, shown over the inset.
#[derive(Component)]
pub struct AnchorCaption;

/// Status line and key reminder rendered by `camera`.
pub fn spawn_window_overlay(commands: &mut Commands, camera: Entity, hint: &str) {
    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                ..default()
            },
            UiTargetCamera(camera),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: STATUS_FONT_SIZE,
                    ..default()
                },
                TextColor(Color::NONE),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                StatusText,
            ));
            parent.spawn((
                Text::new(hint),
                TextFont {
                    font_size: HINT_FONT_SIZE,
                    ..default()
                },
                TextColor(HINT_COLOUR),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(8.0),
                    left: Val::Px(12.0),
                    ..default()
                },
            ));
        });
}

pub fn spawn_anchor_caption(commands: &mut Commands, camera: Entity) {
    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: HINT_FONT_SIZE,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            right: Val::Px(12.0),
            ..default()
        },
        UiTargetCamera(camera),
        AnchorCaption,
    ));
}

pub fn status_text_update_system(
    session: Res<SharedSession>,
    mut query: Query<(&mut Text, &mut TextColor), With<StatusText>>,
) {
    let state = session.lock();
    let visible = state.status.visible(state.now);
    for (mut text, mut colour) in &mut query {
        match visible {
            Some((message, faded)) => {
                if text.0 != message {
                    text.0 = message.to_string();
                }
                colour.0 = faded;
            }
            None if !text.0.is_empty() => text.0.clear(),
            None => {}
        }
    }
}

pub fn anchor_caption_update_system(
    session: Res<SharedSession>,
    mut query: Query<&mut Text, With<AnchorCaption>>,
) {
    let state = session.lock();
    let caption = state.panel.anchor_caption().unwrap_or_default();
    for mut text in &mut query {
        if text.0 != caption {
            text.0.clone_from(&caption);
        }
    }
}
