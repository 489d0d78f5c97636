use crate::types::Coords;

pub const DEFAULT_ZOOM: u8 = 16;
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupOptions {
    pub max_width: u32,
    pub min_width: u32,
    pub auto_close: bool,
    pub close_on_click: bool,
    pub class_name: String,
}

/// Popups stay open when the map is clicked or another popup opens.
impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            max_width: 250,
            min_width: 100,
            auto_close: false,
            close_on_click: false,
            class_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub at: Coords,
    pub popup: PopupOptions,
    pub content: String,
    pub open: bool,
}

/// The map widget the controller draws on.
pub trait MapWidget {
    fn set_view(&mut self, center: Coords, zoom: u8, animate: bool);

    fn add_tile_layer(&mut self, url_template: &str);

    fn add_marker(&mut self, marker: Marker);

    /// Drops everything drawn so far, as a page reload would.
    fn reset(&mut self);
}

/// In-process map scene: keeps what a real widget would display.
#[derive(Debug, Default, Clone)]
pub struct SceneMap {
    center: Option<Coords>,
    zoom: u8,
    tile_layers: Vec<String>,
    markers: Vec<Marker>,
    moves: usize,
}

impl SceneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn center(&self) -> Option<Coords> {
        self.center
    }

    pub const fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn tile_layers(&self) -> &[String] {
        &self.tile_layers
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn open_popups(&self) -> usize {
        self.markers.iter().filter(|m| m.open).count()
    }

    /// Number of animated view changes.
    pub const fn moves(&self) -> usize {
        self.moves
    }
}

impl MapWidget for SceneMap {
    fn set_view(&mut self, center: Coords, zoom: u8, animate: bool) {
        tracing::trace!(%center, zoom, animate, "map set_view");
        self.center = Some(center);
        self.zoom = zoom;
        if animate {
            self.moves += 1;
        }
    }

    fn add_tile_layer(&mut self, url_template: &str) {
        self.tile_layers.push(url_template.to_string());
    }

    fn add_marker(&mut self, marker: Marker) {
        // Opening a popup never closes the others.
        tracing::trace!(at = %marker.at, class = %marker.popup.class_name, "map add_marker");
        self.markers.push(marker);
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popups_accumulate() {
        let mut map = SceneMap::new();
        for i in 0..3 {
            map.add_marker(Marker {
                at: Coords::new(f64::from(i), 0.0),
                popup: PopupOptions::default(),
                content: format!("m{i}"),
                open: true,
            });
        }
        assert_eq!(map.open_popups(), 3);
    }

    #[test]
    fn reset_clears_scene() {
        let mut map = SceneMap::new();
        map.set_view(Coords::new(1.0, 2.0), DEFAULT_ZOOM, false);
        map.add_tile_layer(DEFAULT_TILE_URL);
        map.set_view(Coords::new(3.0, 4.0), DEFAULT_ZOOM, true);
        assert_eq!(map.moves(), 1);
        map.reset();
        assert_eq!(map.center(), None);
        assert!(map.tile_layers().is_empty());
        assert_eq!(map.moves(), 0);
    }
}
