//! Grayscale colours for e-ink panels, plus the one red accent for errors.

use gpui::{Hsla, rgb};

pub fn paper() -> Hsla {
    rgb(0xffffff).into()
}

pub fn ink() -> Hsla {
    rgb(0x000000).into()
}

pub fn rule() -> Hsla {
    rgb(0xd1d5db).into()
}

pub fn bubble() -> Hsla {
    rgb(0xf3f4f6).into()
}

pub fn bubble_border() -> Hsla {
    rgb(0xd1d5db).into()
}

pub fn error_background() -> Hsla {
    rgb(0xfee2e2).into()
}

pub fn error_accent() -> Hsla {
    rgb(0xef4444).into()
}

pub fn error_text() -> Hsla {
    rgb(0xb91c1c).into()
}
