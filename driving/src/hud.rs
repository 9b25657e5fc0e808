use bevy::{
    color::palettes::css::{GOLD, WHITE},
    diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin},
    prelude::*,
};
use vehicle::VehicleController;

use crate::car::Car;
use crate::coins::Credits;

#[derive(Component)]
pub struct CreditsText;

#[derive(Component)]
pub struct SpeedText;

#[derive(Component)]
pub struct FpsCounterText;

#[derive(Component)]
pub struct PausedBanner;

fn panel(top: f32, label: &str, color: Color) -> impl Bundle {
    (
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(top),
            left: Val::Px(8.0),
            padding: UiRect::axes(Val::Px(8.0), Val::Px(4.0)),
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.55)),
        Text::new(label),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(color),
    )
}

pub fn spawn_hud(mut commands: Commands) {
    commands.spawn((panel(8.0, "Credits: 0", GOLD.into()), CreditsText));
    commands.spawn((panel(40.0, "Speed: --", WHITE.into()), SpeedText));
    commands.spawn((panel(72.0, "FPS: --", WHITE.into()), FpsCounterText));
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            top: Val::Percent(45.0),
            width: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            ..default()
        },
        Text::new("PAUSED"),
        TextFont {
            font_size: 48.0,
            ..default()
        },
        TextColor(WHITE.into()),
        Visibility::Hidden,
        PausedBanner,
    ));
}

pub fn credits_label(credits: u32) -> String {
    format!("Credits: {credits}")
}

/// Speed in km/h from a forward speed in m/s. Reversing reads as a negative.
pub fn speed_label(forward_speed: f32) -> String {
    format!("Speed: {:>4.0} km/h", forward_speed * 3.6)
}

pub fn update_hud(
    credits: Res<Credits>,
    diagnostics: Res<DiagnosticsStore>,
    car: Query<&VehicleController, With<Car>>,
    mut credits_text: Query<&mut Text, (With<CreditsText>, Without<SpeedText>, Without<FpsCounterText>)>,
    mut speed_text: Query<&mut Text, (With<SpeedText>, Without<CreditsText>, Without<FpsCounterText>)>,
    mut fps_text: Query<&mut Text, (With<FpsCounterText>, Without<CreditsText>, Without<SpeedText>)>,
) {
    if credits.is_changed()
        && let Ok(mut text) = credits_text.single_mut()
    {
        text.0 = credits_label(credits.0);
    }

    if let (Ok(controller), Ok(mut text)) = (car.single(), speed_text.single_mut()) {
        text.0 = speed_label(controller.forward_speed());
    }

    if let Ok(mut text) = fps_text.single_mut()
        && let Some(fps) = diagnostics
            .get(&FrameTimeDiagnosticsPlugin::FPS)
            .and_then(|value| value.smoothed())
    {
        text.0 = format!("FPS: {fps:>3.0}");
    }
}

pub fn show_paused(mut banner: Query<&mut Visibility, With<PausedBanner>>) {
    for mut visibility in &mut banner {
        *visibility = Visibility::Visible;
    }
}

pub fn hide_paused(mut banner: Query<&mut Visibility, With<PausedBanner>>) {
    for mut visibility in &mut banner {
        *visibility = Visibility::Hidden;
    }
}

#[cfg(test)]
mod tests {
    use super::{credits_label, speed_label};

    #[test]
    fn labels_format_values() {
        assert_eq!(credits_label(3), "Credits: 3");
        assert_eq!(speed_label(10.0), "Speed:   36 km/h");
        assert_eq!(speed_label(-5.0), "Speed:  -18 km/h");
    }
}
