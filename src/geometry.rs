//! Geometrische Hilfsfunktionen für die 2D-Ladeflächenplanung.
//!
//! Dieses Modul stellt das achsenparallele Rechteck sowie die reinen
//! Prädikate für Überlappung und Ladeflächen-Grenzen bereit. Alle Werte
//! sind ganzzahlige Zentimeter im Koordinatensystem der Ladefläche:
//! x läuft entlang der Längsachse, y entlang der kurzen Achse, Ursprung
//! oben links. Keine Seiteneffekte, keine Toleranzen.

/// Achsenparalleles Rechteck auf der Ladefläche.
///
/// `length` ist die Ausdehnung entlang der Längsachse (x), `width` die
/// Ausdehnung entlang der kurzen Achse (y). Bei gedrehten Paletten müssen
/// die Aufrufer bereits die effektiven Maße einsetzen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub length: i32,
    pub width: i32,
}

impl Rect {
    /// Erstellt ein neues Rechteck aus Ursprung und effektiven Maßen.
    #[inline]
    pub const fn new(x: i32, y: i32, length: i32, width: i32) -> Self {
        Self {
            x,
            y,
            length,
            width,
        }
    }

    /// Rechte Kante (x + Länge).
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.length
    }

    /// Untere Kante (y + Breite).
    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.width
    }
}

/// Prüft, ob zwei Rechtecke sich mit positiver Fläche überschneiden.
///
/// Vereinfachtes Separating-Axis-Theorem für AABBs: alle vier Vergleiche
/// sind strikt, Kantenkontakt zählt daher NICHT als Überlappung.
///
/// # Parameter
/// * `a` - Erstes Rechteck
/// * `b` - Zweites Rechteck
///
/// # Rückgabewert
/// `true` wenn sich die Rechtecke überschneiden, sonst `false`
#[inline]
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
}

/// Prüft, ob ein Rechteck vollständig innerhalb der Ladefläche liegt.
///
/// Die Ladefläche ist `[0, truck_length] × [0, truck_width]`; ein Rechteck,
/// das bündig mit einer Wand abschließt, liegt noch innerhalb.
///
/// # Parameter
/// * `r` - Das zu prüfende Rechteck
/// * `truck_length` - Ausdehnung der Längsachse in cm
/// * `truck_width` - Ausdehnung der kurzen Achse in cm
#[inline]
pub fn in_bounds(r: &Rect, truck_length: i32, truck_width: i32) -> bool {
    r.x >= 0 && r.y >= 0 && r.right() <= truck_length && r.bottom() <= truck_width
}

/// Begrenzt einen Ursprung so, dass ein Rechteck der gegebenen Maße
/// vollständig auf der Ladefläche liegt.
///
/// # Rückgabewert
/// Der nächstgelegene gültige Ursprung `(x, y)`
#[inline]
pub fn clamp_origin(
    x: i32,
    y: i32,
    length: i32,
    width: i32,
    truck_length: i32,
    truck_width: i32,
) -> (i32, i32) {
    (
        x.clamp(0, (truck_length - length).max(0)),
        y.clamp(0, (truck_width - width).max(0)),
    )
}
