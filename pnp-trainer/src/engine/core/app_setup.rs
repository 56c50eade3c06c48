use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy::render::camera::RenderTarget;
use bevy::render::view::{NoFrustumCulling, RenderLayers};
use bevy::sprite::Anchor;
use bevy::window::{
    ExitCondition, PresentMode, PrimaryWindow, WindowCloseRequested, WindowClosed, WindowRef,
    WindowResolution,
};
use bytemuck::Zeroable;
use constants::camera::{FOV_DEGREES, NEAR_PLANE};
use constants::render_settings::{
    BACKGROUND_COLOUR, IMAGE_LAYER, INSET_LAYER, MATCH_WINDOW_TITLE, MATCHER_POINT_SIZE,
    VIEWER_LAYER, VIEWER_WINDOW_TITLE, WINDOW_HEIGHT, WINDOW_WIDTH,
};
use constants::status::{MATCHER_HINT, VIEWER_HINT};

use super::overlay::{
    anchor_caption_update_system, spawn_anchor_caption, spawn_window_overlay,
    status_text_update_system,
};
use super::session::{SharedSession, StopSignal};
use super::views::{ViewKind, ViewRegistry, dispatch_view_input};
use crate::cli::TrainerConfig;
use crate::engine::camera::camera_sync::{
    ImagePanelCamera, InsetCamera, ViewerCamera, sync_match_cameras, sync_viewer_camera,
};
use crate::engine::render::PointCloudRenderPlugin;
use crate::engine::render::bridge::{
    InsetPointCloud, InsetPoints, PointSpriteTarget, ViewerPoints, sync_point_sprite_viewports,
    upload_inset_points, upload_viewer_selection,
};
use crate::engine::render::material::PointCloudMaterial;
use crate::engine::render::point_cloud_mesh::create_point_sprite_mesh;
use crate::engine::render::vertex_buffer::{PointVertex, build_vertices};
use crate::tools::matcher::{ImageGizmos, MatcherView, draw_image_overlay, sync_match_panel};
use crate::tools::viewer::{ViewerView, draw_axes, draw_pick_ray};

/// Scene content prepared before the app starts and consumed by [`setup`].
#[derive(Resource)]
struct PendingScene {
    image: Option<Image>,
    vertices: Vec<PointVertex>,
    viewer_point_size: f32,
}

/// Build the two-window app around an already loaded session.
pub fn create_app(config: &TrainerConfig, session: SharedSession, image: Image) -> App {
    let window = Vec2::new(WINDOW_WIDTH, WINDOW_HEIGHT);
    let image_size = image.size().as_vec2();
    let (viewer, vertices) = {
        let state = session.lock();
        (
            ViewerView::new(&state.stats, window),
            build_vertices(&state.cloud, state.controller.selection()),
        )
    };

    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .add_plugins(PointCloudRenderPlugin)
        .init_gizmo_group::<ImageGizmos>()
        .insert_resource(ClearColor(BACKGROUND_COLOUR))
        .insert_resource(session)
        .init_resource::<StopSignal>()
        .init_resource::<ViewRegistry>()
        .insert_resource(viewer)
        .insert_resource(MatcherView::new(
            image_size,
            window,
            config.click_radius,
            config.best_only,
        ))
        .insert_resource(PendingScene {
            image: Some(image),
            vertices,
            viewer_point_size: config.viewer_point_size(),
        });

    app.add_systems(Startup, (configure_gizmos, setup))
        .add_systems(
            Update,
            (
                dispatch_view_input,
                sync_match_panel,
                (upload_viewer_selection, upload_inset_points),
                (sync_viewer_camera, sync_match_cameras),
                sync_point_sprite_viewports,
                (
                    draw_axes,
                    draw_pick_ray,
                    draw_image_overlay,
                    status_text_update_system,
                    anchor_caption_update_system,
                ),
            )
                .chain(),
        )
        .add_systems(Update, (stop_on_window_close, exit_on_stop).chain());

    app
}

fn configure_gizmos(mut store: ResMut<GizmoConfigStore>) {
    let (config, _) = store.config_mut::<DefaultGizmoConfigGroup>();
    config.render_layers = RenderLayers::layer(VIEWER_LAYER);

    let (config, _) = store.config_mut::<ImageGizmos>();
    config.render_layers = RenderLayers::layer(IMAGE_LAYER);
    config.line.width = 1.5;
}

fn perspective() -> Projection {
    Projection::Perspective(PerspectiveProjection {
        fov: FOV_DEGREES.to_radians(),
        near: NEAR_PLANE,
        ..default()
    })
}

fn setup(
    mut commands: Commands,
    mut pending: ResMut<PendingScene>,
    mut registry: ResMut<ViewRegistry>,
    primary: Query<Entity, With<PrimaryWindow>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<PointCloudMaterial>>,
    mut images: ResMut<Assets<Image>>,
) {
    let Ok(viewer_window) = primary.single() else {
        error!("No primary window to draw the point cloud in");
        return;
    };
    registry.register(viewer_window, ViewKind::Viewer);

    let match_window = commands
        .spawn(Window {
            title: MATCH_WINDOW_TITLE.into(),
            resolution: WindowResolution::new(WINDOW_WIDTH, WINDOW_HEIGHT),
            present_mode: PresentMode::AutoVsync,
            ..default()
        })
        .id();
    registry.register(match_window, ViewKind::Matcher);

    spawn_viewer(&mut commands, &mut pending, &mut meshes, &mut materials, viewer_window);
    if let Some(image) = pending.image.take() {
        spawn_matcher(
            &mut commands,
            images.add(image),
            &mut meshes,
            &mut materials,
            match_window,
        );
    }
    commands.remove_resource::<PendingScene>();
}

fn spawn_viewer(
    commands: &mut Commands,
    pending: &mut PendingScene,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<PointCloudMaterial>,
    window: Entity,
) {
    let vertices = std::mem::take(&mut pending.vertices);
    let mesh = meshes.add(create_point_sprite_mesh(&vertices));
    let material = materials.add(PointCloudMaterial::new(pending.viewer_point_size));

    commands.spawn((
        Mesh3d(mesh.clone()),
        MeshMaterial3d(material.clone()),
        Transform::IDENTITY,
        NoFrustumCulling,
        RenderLayers::layer(VIEWER_LAYER),
    ));
    let camera = commands
        .spawn((
            Camera3d::default(),
            Camera {
                target: RenderTarget::Window(WindowRef::Entity(window)),
                ..default()
            },
            perspective(),
            RenderLayers::layer(VIEWER_LAYER),
            ViewerCamera,
            PointSpriteTarget(material),
        ))
        .id();
    spawn_window_overlay(commands, camera, VIEWER_HINT);

    commands.insert_resource(ViewerPoints {
        vertices,
        mesh,
        uploaded_revision: 0,
    });
}

fn spawn_matcher(
    commands: &mut Commands,
    image: Handle<Image>,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<PointCloudMaterial>,
    window: Entity,
) {
    let target = RenderTarget::Window(WindowRef::Entity(window));

    // Image panel, world y points up so image rows run towards -y.
    commands.spawn((
        Sprite {
            image,
            anchor: Anchor::TopLeft,
            ..default()
        },
        Transform::IDENTITY,
        RenderLayers::layer(IMAGE_LAYER),
    ));
    let image_camera = commands
        .spawn((
            Camera2d,
            Camera {
                target: target.clone(),
                order: 0,
                ..default()
            },
            RenderLayers::layer(IMAGE_LAYER),
            ImagePanelCamera,
        ))
        .id();
    spawn_window_overlay(commands, image_camera, MATCHER_HINT);

    // Placeholder point until the first neighbourhood arrives.
    let mesh = meshes.add(create_point_sprite_mesh(&[PointVertex::zeroed()]));
    let material = materials.add(PointCloudMaterial::new(MATCHER_POINT_SIZE));
    commands.spawn((
        Mesh3d(mesh.clone()),
        MeshMaterial3d(material.clone()),
        Transform::IDENTITY,
        Visibility::Hidden,
        NoFrustumCulling,
        RenderLayers::layer(INSET_LAYER),
        InsetPointCloud,
    ));
    // The image camera has already cleared the window.
    let inset_camera = commands
        .spawn((
            Camera3d::default(),
            Camera {
                target,
                order: 1,
                clear_color: ClearColorConfig::None,
                ..default()
            },
            perspective(),
            RenderLayers::layer(INSET_LAYER),
            InsetCamera,
            PointSpriteTarget(material),
        ))
        .id();
    spawn_anchor_caption(commands, inset_camera);

    commands.insert_resource(InsetPoints {
        mesh,
        uploaded_revision: 0,
    });
}

/// Closing either window ends the session.
fn stop_on_window_close(
    mut requested: EventReader<WindowCloseRequested>,
    mut closed: EventReader<WindowClosed>,
    stop: Res<StopSignal>,
) {
    let requested = requested.read().count() > 0;
    let closed = closed.read().count() > 0;
    if requested || closed {
        stop.raise();
    }
}

fn exit_on_stop(stop: Res<StopSignal>, mut exit: EventWriter<AppExit>) {
    if stop.is_raised() {
        info!("Stop requested, closing both windows");
        exit.write(AppExit::Success);
    }
}

fn create_window_config() -> Window {
    Window {
        title: VIEWER_WINDOW_TITLE.into(),
        resolution: WindowResolution::new(WINDOW_WIDTH, WINDOW_HEIGHT),
        present_mode: PresentMode::AutoVsync,
        ..default()
    }
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        exit_condition: ExitCondition::DontExit,
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
