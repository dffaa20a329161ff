//! Seed data: the built-in theme table used when the config does not provide one.

use crate::domain::Theme;

#[allow(clippy::too_many_arguments)]
fn theme(id: &str, name: &str, background: &str, emoji: &str, accent: &str, box_background: &str, box_border: &str, text_color: &str) -> Theme {
  Theme {
    id: id.into(),
    name: name.into(),
    background: background.into(),
    emoji: emoji.into(),
    accent: accent.into(),
    box_background: box_background.into(),
    box_border: box_border.into(),
    text_color: text_color.into(),
  }
}

/// Five themes that guarantee the game has something to show without external config.
pub fn seed_themes() -> Vec<Theme> {
  vec![
    theme("fish", "Bể cá", "bg-sky-100", "🐠", "text-sky-600", "bg-white/60", "border-sky-400", "text-sky-900"),
    theme("zoo", "Vườn thú", "bg-emerald-100", "🐰", "text-emerald-600", "bg-white/60", "border-emerald-400", "text-emerald-900"),
    theme("sky", "Bầu trời", "bg-indigo-900", "⭐", "text-yellow-400", "bg-white/10", "border-yellow-400", "text-white"),
    theme("farm", "Nông trại", "bg-orange-50", "🍎", "text-orange-600", "bg-white/60", "border-orange-400", "text-orange-900"),
    theme("road", "Đường phố", "bg-slate-200", "🚗", "text-slate-600", "bg-white/60", "border-slate-500", "text-slate-900"),
  ]
}

/// Last resort when a theme table turns out empty at runtime.
pub fn hard_fallback_theme() -> Theme {
  theme("plain", "Lớp học", "bg-white", "🔵", "text-indigo-600", "bg-white/60", "border-indigo-300", "text-indigo-900")
}
