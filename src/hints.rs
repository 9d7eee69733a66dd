//! Notification hints.
//!
//! Hints travel as `a{sv}`: every entry carries its own D-Bus type, so a
//! [`Hint`] is a tagged value rather than a single concrete type. Unknown hint
//! names are forwarded as given; servers ignore what they do not understand.

use dbus::arg::{PropMap, RefArg, Variant};

/// Raw image payload for the `image-data` hint, D-Bus signature `(iiibiiay)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: i32,
    pub height: i32,
    pub rowstride: i32,
    pub has_alpha: bool,
    pub bits_per_sample: i32,
    pub channels: i32,
    pub data: Vec<u8>,
}

impl ImageData {
    /// Packed 8-bit RGB or RGBA pixels.
    pub fn from_rgba(width: i32, height: i32, has_alpha: bool, data: Vec<u8>) -> Self {
        let channels = if has_alpha { 4 } else { 3 };

        Self {
            width,
            height,
            rowstride: width.saturating_mul(channels),
            has_alpha,
            bits_per_sample: 8,
            channels,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Hint {
    Bool(bool),
    Byte(u8),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    StringList(Vec<String>),
    Image(ImageData),
}

impl Hint {
    pub fn to_variant(&self) -> Variant<Box<dyn RefArg>> {
        let value: Box<dyn RefArg> = match self {
            Hint::Bool(b) => Box::new(*b),
            Hint::Byte(b) => Box::new(*b),
            Hint::Int32(i) => Box::new(*i),
            Hint::UInt32(u) => Box::new(*u),
            Hint::Int64(i) => Box::new(*i),
            Hint::Double(d) => Box::new(*d),
            Hint::String(s) => Box::new(s.clone()),
            Hint::Bytes(bytes) => Box::new(bytes.clone()),
            Hint::StringList(list) => Box::new(list.clone()),
            Hint::Image(image) => Box::new((
                image.width,
                image.height,
                image.rowstride,
                image.has_alpha,
                image.bits_per_sample,
                image.channels,
                image.data.clone(),
            )),
        };

        Variant(value)
    }
}

impl From<bool> for Hint {
    fn from(value: bool) -> Self {
        Hint::Bool(value)
    }
}

impl From<u8> for Hint {
    fn from(value: u8) -> Self {
        Hint::Byte(value)
    }
}

impl From<i32> for Hint {
    fn from(value: i32) -> Self {
        Hint::Int32(value)
    }
}

impl From<u32> for Hint {
    fn from(value: u32) -> Self {
        Hint::UInt32(value)
    }
}

impl From<&str> for Hint {
    fn from(value: &str) -> Self {
        Hint::String(value.to_owned())
    }
}

impl From<String> for Hint {
    fn from(value: String) -> Self {
        Hint::String(value)
    }
}

impl From<ImageData> for Hint {
    fn from(value: ImageData) -> Self {
        Hint::Image(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Low = 0,
    Normal = 1,
    Critical = 2,
}

/// Well-known hint names and typed constructors for them.
pub mod well_known {
    use super::{Hint, ImageData, Urgency};

    pub const URGENCY: &str = "urgency";
    pub const CATEGORY: &str = "category";
    pub const DESKTOP_ENTRY: &str = "desktop-entry";
    pub const IMAGE_DATA: &str = "image-data";
    pub const IMAGE_PATH: &str = "image-path";
    pub const SOUND_FILE: &str = "sound-file";
    pub const SOUND_NAME: &str = "sound-name";
    pub const SUPPRESS_SOUND: &str = "suppress-sound";
    pub const TRANSIENT: &str = "transient";
    pub const RESIDENT: &str = "resident";
    pub const ACTION_ICONS: &str = "action-icons";
    pub const X: &str = "x";
    pub const Y: &str = "y";

    pub fn urgency(level: Urgency) -> (&'static str, Hint) {
        (URGENCY, Hint::Byte(level as u8))
    }

    pub fn category(category: &str) -> (&'static str, Hint) {
        (CATEGORY, category.into())
    }

    pub fn desktop_entry(entry: &str) -> (&'static str, Hint) {
        (DESKTOP_ENTRY, entry.into())
    }

    pub fn image_data(image: ImageData) -> (&'static str, Hint) {
        (IMAGE_DATA, image.into())
    }

    pub fn image_path(path: &str) -> (&'static str, Hint) {
        (IMAGE_PATH, path.into())
    }

    pub fn sound_file(path: &str) -> (&'static str, Hint) {
        (SOUND_FILE, path.into())
    }

    /// A themeable sound name from the freedesktop sound naming spec.
    pub fn sound_name(name: &str) -> (&'static str, Hint) {
        (SOUND_NAME, name.into())
    }

    pub fn suppress_sound(suppress: bool) -> (&'static str, Hint) {
        (SUPPRESS_SOUND, suppress.into())
    }

    pub fn transient(transient: bool) -> (&'static str, Hint) {
        (TRANSIENT, transient.into())
    }

    pub fn resident(resident: bool) -> (&'static str, Hint) {
        (RESIDENT, resident.into())
    }

    pub fn action_icons(enabled: bool) -> (&'static str, Hint) {
        (ACTION_ICONS, enabled.into())
    }

    pub fn position(x: i32, y: i32) -> [(&'static str, Hint); 2] {
        [(X, x.into()), (Y, y.into())]
    }
}

/// Converts a set of hints into the `a{sv}` dictionary sent with `Notify`.
pub fn to_prop_map<'a, I>(hints: I) -> PropMap
where
    I: IntoIterator<Item = (&'a String, &'a Hint)>,
{
    hints
        .into_iter()
        .map(|(name, hint)| (name.clone(), hint.to_variant()))
        .collect()
}
