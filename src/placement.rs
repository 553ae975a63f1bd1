//! Platzierungslogik für Paletten auf der Ladefläche.
//!
//! Dieses Modul implementiert die First-Fit-Suche über das ganzzahlige
//! Zellenraster der Ladefläche sowie den Platzierungslauf über alle noch
//! nicht platzierten Paletten:
//! - Deterministische Scan-Reihenfolge (explizit konfigurierbar)
//! - Optionale Drehung um 90°, wenn die Normallage keinen Platz findet
//! - Bereits platzierte Paletten werden niemals automatisch verschoben
//!
//! Die Suche ist bewusst erschöpfend: O(Länge × Breite) Zellen mit je
//! einem O(n)-Kollisionstest gegen die platzierten Paletten.

use crate::geometry::{self, Rect};
use crate::model::{Pallet, TruckDims};

/// Scan-Reihenfolge der First-Fit-Suche.
///
/// Die Wahl der äußeren und inneren Schleife entscheidet, welche Layouts
/// entstehen; sie ist deshalb ein expliziter Parameter und niemals ein
/// Nebeneffekt der Schleifenverschachtelung.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOrder {
    /// Füllt zuerst die kurze Achse: Kandidaten in (x aufsteigend,
    /// y aufsteigend), y läuft innen. Paletten stapeln sich quer über
    /// die Ladefläche, bevor x vorrückt - minimiert die Lademeter.
    WidthFirst,
    /// Füllt zuerst die Längsachse: Kandidaten in (y aufsteigend,
    /// x aufsteigend), x läuft innen. Paletten bilden Reihen entlang
    /// der Längsachse.
    LengthFirst,
}

impl Default for ScanOrder {
    /// `WidthFirst` ist der dokumentierte Standard; er entspricht dem
    /// klassischen Ladeplan (erst die Breite füllen, dann vorrücken).
    fn default() -> Self {
        ScanOrder::WidthFirst
    }
}

/// Konfiguration für die Platzierungssuche.
#[derive(Clone, Copy, Debug)]
pub struct PlacementConfig {
    /// Maße der Ladefläche in cm.
    pub truck: TruckDims,
    /// Scan-Reihenfolge der Kandidatensuche.
    pub scan_order: ScanOrder,
    /// Erlaubt der automatischen Platzierung die gedrehte Lage,
    /// falls die Normallage keinen Platz findet.
    pub allow_rotation: bool,
}

impl PlacementConfig {
    pub const DEFAULT_ALLOW_ROTATION: bool = false;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> PlacementConfigBuilder {
        PlacementConfigBuilder::default()
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            truck: TruckDims::default(),
            scan_order: ScanOrder::default(),
            allow_rotation: Self::DEFAULT_ALLOW_ROTATION,
        }
    }
}

/// Builder-Pattern für PlacementConfig.
#[derive(Clone, Debug, Default)]
pub struct PlacementConfigBuilder {
    config: PlacementConfig,
}

impl PlacementConfigBuilder {
    /// Setzt die Maße der Ladefläche.
    pub fn truck(mut self, truck: TruckDims) -> Self {
        self.config.truck = truck;
        self
    }

    /// Setzt die Scan-Reihenfolge.
    pub fn scan_order(mut self, order: ScanOrder) -> Self {
        self.config.scan_order = order;
        self
    }

    /// Erlaubt oder verbietet die gedrehte Lage.
    pub fn allow_rotation(mut self, allow: bool) -> Self {
        self.config.allow_rotation = allow;
        self
    }

    /// Erstellt die finale Konfiguration.
    pub fn build(self) -> PlacementConfig {
        self.config
    }
}

/// Ergebnis der drehungsbewussten Suche: Ursprung plus gewählte Lage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fit {
    pub x: i32,
    pub y: i32,
    pub rotated: bool,
}

/// Palette, die in einem Platzierungslauf keinen Platz gefunden hat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct UnplacedPallet {
    pub id: u32,
    pub group_id: u32,
}

/// Ergebnis eines Platzierungslaufs.
///
/// `placed` zählt die in diesem Lauf neu platzierten Paletten;
/// `unplaced` nennt die Paletten, für die kein Stellplatz frei war
/// (nicht fatal - sie bleiben im Bestand und werden bei der nächsten
/// Geometrieänderung erneut versucht).
#[derive(Clone, Debug, Default)]
pub struct PlacementReport {
    pub placed: usize,
    pub unplaced: Vec<UnplacedPallet>,
}

impl PlacementReport {
    /// Gibt an, ob alle Paletten des Laufs einen Platz gefunden haben.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }
}

/// Ereignisse eines Platzierungslaufs, geeignet für Live-Visualisierung
/// per SSE (siehe `api::handle_add_group_stream`).
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type")]
pub enum PlacementEvent {
    /// Eine neue Ladungsgruppe wurde angelegt.
    GroupAdded {
        group_id: u32,
        color: String,
        quantity: i32,
    },
    /// Eine Palette hat einen Stellplatz gefunden.
    PalletPlaced {
        id: u32,
        group_id: u32,
        x: i32,
        y: i32,
        rotated: bool,
    },
    /// Für eine Palette war kein Stellplatz frei.
    PalletUnplaced { id: u32, group_id: u32 },
    /// Lauf abgeschlossen.
    Finished { placed: usize, unplaced: usize },
}

/// Prüft, ob ein Kandidatenrechteck frei ist.
///
/// Frei heißt: vollständig innerhalb der Ladefläche und ohne Überlappung
/// mit irgendeiner anderen, aktuell platzierten Palette. Die Palette mit
/// `exclude_id` wird ignoriert, damit eine Palette gegen ihren eigenen
/// alten Stellplatz getestet werden kann.
pub fn position_available(
    candidate: &Rect,
    exclude_id: u32,
    pallets: &[Pallet],
    truck: &TruckDims,
) -> bool {
    if !geometry::in_bounds(candidate, truck.length, truck.width) {
        return false;
    }

    !pallets.iter().any(|other| {
        other.placed && other.id != exclude_id && geometry::overlaps(candidate, &other.rect())
    })
}

/// First-Fit-Suche über das Zellenraster der Ladefläche.
///
/// Liefert den ERSTEN Ursprung in Scan-Reihenfolge, an dem ein Rechteck
/// mit den gegebenen effektiven Maßen kollisionsfrei innerhalb der
/// Ladefläche liegt.
///
/// # Parameter
/// * `eff_width` - Effektive Breite (kurze Achse) in cm
/// * `eff_length` - Effektive Länge (Längsachse) in cm
/// * `exclude_id` - Id der Palette, die gerade platziert wird
/// * `pallets` - Gesamtbestand; nur platzierte Paletten blockieren
/// * `config` - Ladeflächenmaße und Scan-Reihenfolge
///
/// # Rückgabewert
/// `Some((x, y))` beim ersten Treffer, sonst `None`
pub fn find_fit(
    eff_width: i32,
    eff_length: i32,
    exclude_id: u32,
    pallets: &[Pallet],
    config: &PlacementConfig,
) -> Option<(i32, i32)> {
    let truck = &config.truck;
    let max_x = truck.length - eff_length;
    let max_y = truck.width - eff_width;
    if max_x < 0 || max_y < 0 {
        return None;
    }

    let available = |x: i32, y: i32| {
        let candidate = Rect::new(x, y, eff_length, eff_width);
        position_available(&candidate, exclude_id, pallets, truck)
    };

    match config.scan_order {
        ScanOrder::WidthFirst => {
            for x in 0..=max_x {
                for y in 0..=max_y {
                    if available(x, y) {
                        return Some((x, y));
                    }
                }
            }
        }
        ScanOrder::LengthFirst => {
            for y in 0..=max_y {
                for x in 0..=max_x {
                    if available(x, y) {
                        return Some((x, y));
                    }
                }
            }
        }
    }
    None
}

/// Drehungsbewusste First-Fit-Suche.
///
/// Versucht zuerst die Normallage mit den NOMINALEN Maßen der Palette.
/// Schlägt sie fehl und ist Drehung erlaubt, wird die gedrehte Lage
/// versucht - aber nur, wenn die gedrehte Breite (= nominale Länge) noch
/// in die kurze Achse passt.
///
/// # Rückgabewert
/// `Some(Fit)` mit Ursprung und gewählter Lage, sonst `None`
pub fn find_fit_with_rotation(
    pallet: &Pallet,
    pallets: &[Pallet],
    config: &PlacementConfig,
) -> Option<Fit> {
    if let Some((x, y)) = find_fit(pallet.width, pallet.length, pallet.id, pallets, config) {
        return Some(Fit {
            x,
            y,
            rotated: false,
        });
    }

    let truck = &config.truck;
    if config.allow_rotation && pallet.length <= truck.width && pallet.width <= truck.length {
        if let Some((x, y)) = find_fit(pallet.length, pallet.width, pallet.id, pallets, config) {
            return Some(Fit {
                x,
                y,
                rotated: true,
            });
        }
    }
    None
}

/// Platzierungslauf über alle noch nicht platzierten Paletten.
///
/// Für jede Palette mit `placed == false` wird die First-Fit-Suche
/// aufgerufen; bei Erfolg werden Position, Lage und `placed` gesetzt,
/// bei Misserfolg bleibt die Palette unplatziert und landet als Warnung
/// im Bericht. Bereits platzierte Paletten (etwa manuell verschobene)
/// werden von diesem Lauf NIE angefasst; ein zweiter Lauf ohne
/// zwischenzeitliche Änderung ist daher ein No-op.
pub fn place_unplaced(pallets: &mut [Pallet], config: &PlacementConfig) -> PlacementReport {
    place_unplaced_with_progress(pallets, config, |_| {})
}

/// Platzierungslauf mit Live-Progress-Callback.
///
/// Ruft für jede platzierte bzw. abgewiesene Palette sowie am Ende des
/// Laufs ein Callback auf (geeignet für SSE).
pub fn place_unplaced_with_progress(
    pallets: &mut [Pallet],
    config: &PlacementConfig,
    mut on_event: impl FnMut(&PlacementEvent),
) -> PlacementReport {
    let mut report = PlacementReport::default();

    for i in 0..pallets.len() {
        if pallets[i].placed {
            continue;
        }

        match find_fit_with_rotation(&pallets[i], pallets, config) {
            Some(fit) => {
                let pallet = &mut pallets[i];
                pallet.x = fit.x;
                pallet.y = fit.y;
                pallet.rotated = fit.rotated;
                pallet.placed = true;
                report.placed += 1;
                on_event(&PlacementEvent::PalletPlaced {
                    id: pallet.id,
                    group_id: pallet.group_id,
                    x: fit.x,
                    y: fit.y,
                    rotated: fit.rotated,
                });
            }
            None => {
                let entry = UnplacedPallet {
                    id: pallets[i].id,
                    group_id: pallets[i].group_id,
                };
                report.unplaced.push(entry);
                on_event(&PlacementEvent::PalletUnplaced {
                    id: entry.id,
                    group_id: entry.group_id,
                });
            }
        }
    }

    on_event(&PlacementEvent::Finished {
        placed: report.placed,
        unplaced: report.unplaced.len(),
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BatchSpec, GROUP_COLORS};

    fn truck() -> TruckDims {
        TruckDims::default()
    }

    fn fresh(id: u32, width: i32, length: i32) -> Pallet {
        let spec = BatchSpec::new(width, length, 1, &truck()).unwrap();
        Pallet::new(id, 1, &spec, GROUP_COLORS[0])
    }

    fn placed_at(id: u32, width: i32, length: i32, x: i32, y: i32) -> Pallet {
        let mut p = fresh(id, width, length);
        p.x = x;
        p.y = y;
        p.placed = true;
        p
    }

    #[test]
    fn width_first_stacks_across_the_short_axis() {
        let config = PlacementConfig::default();
        let mut pallets = vec![fresh(0, 120, 80), fresh(1, 120, 80), fresh(2, 120, 80)];

        let report = place_unplaced(&mut pallets, &config);
        assert!(report.is_complete());
        assert_eq!(report.placed, 3);

        assert_eq!((pallets[0].x, pallets[0].y), (0, 0));
        assert_eq!((pallets[1].x, pallets[1].y), (0, 120));
        assert_eq!((pallets[2].x, pallets[2].y), (80, 0));
    }

    #[test]
    fn length_first_fills_rows_along_the_long_axis() {
        let config = PlacementConfig::builder()
            .scan_order(ScanOrder::LengthFirst)
            .build();
        let mut pallets = vec![fresh(0, 120, 80), fresh(1, 120, 80), fresh(2, 120, 80)];

        let report = place_unplaced(&mut pallets, &config);
        assert!(report.is_complete());

        assert_eq!((pallets[0].x, pallets[0].y), (0, 0));
        assert_eq!((pallets[1].x, pallets[1].y), (80, 0));
        assert_eq!((pallets[2].x, pallets[2].y), (160, 0));
    }

    #[test]
    fn placed_pallets_never_overlap_after_a_run() {
        let config = PlacementConfig::default();
        let mut pallets: Vec<Pallet> = (0..12).map(|i| fresh(i, 100, 120)).collect();

        place_unplaced(&mut pallets, &config);

        for a in pallets.iter().filter(|p| p.placed) {
            for b in pallets.iter().filter(|p| p.placed) {
                if a.id != b.id {
                    assert!(
                        !crate::geometry::overlaps(&a.rect(), &b.rect()),
                        "Paletten {} und {} überlappen sich",
                        a.id,
                        b.id
                    );
                }
            }
            assert!(crate::geometry::in_bounds(
                &a.rect(),
                config.truck.length,
                config.truck.width
            ));
        }
    }

    #[test]
    fn second_run_without_changes_is_a_noop() {
        let config = PlacementConfig::default();
        let mut pallets = vec![fresh(0, 120, 80), fresh(1, 100, 140), fresh(2, 80, 60)];

        place_unplaced(&mut pallets, &config);
        let positions: Vec<_> = pallets.iter().map(|p| (p.x, p.y, p.rotated)).collect();

        let report = place_unplaced(&mut pallets, &config);
        assert_eq!(report.placed, 0);
        assert!(report.unplaced.is_empty());
        let after: Vec<_> = pallets.iter().map(|p| (p.x, p.y, p.rotated)).collect();
        assert_eq!(positions, after, "zweiter Lauf darf nichts verschieben");
    }

    #[test]
    fn manually_positioned_pallets_are_respected() {
        let config = PlacementConfig::default();
        // Mitten auf der Fläche, nicht dort, wo First-Fit sie ablegen würde.
        let anchored = placed_at(7, 100, 100, 600, 80);
        let mut pallets = vec![anchored, fresh(8, 100, 100)];

        place_unplaced(&mut pallets, &config);

        assert_eq!((pallets[0].x, pallets[0].y), (600, 80));
        assert!(pallets[1].placed);
        assert!(!crate::geometry::overlaps(
            &pallets[0].rect(),
            &pallets[1].rect()
        ));
    }

    #[test]
    fn full_truck_leaves_the_extra_pallet_unplaced() {
        let config = PlacementConfig::default();
        // Zwei Paletten über die volle Breite füllen die Fläche exakt.
        let mut pallets = vec![
            placed_at(0, 244, 680, 0, 0),
            placed_at(1, 244, 680, 680, 0),
            fresh(2, 10, 10),
        ];

        let report = place_unplaced(&mut pallets, &config);
        assert_eq!(report.placed, 0);
        assert_eq!(report.unplaced, vec![UnplacedPallet { id: 2, group_id: 1 }]);
        assert!(!pallets[2].placed);
        assert_eq!((pallets[0].x, pallets[0].y), (0, 0));
        assert_eq!((pallets[1].x, pallets[1].y), (680, 0));
    }

    #[test]
    fn excluded_pallet_does_not_block_its_own_slot() {
        let config = PlacementConfig::default();
        let anchored = placed_at(3, 120, 80, 0, 0);
        let pallets = vec![anchored];

        // Die eigene Palette blockiert nicht: ihr alter Platz ist frei.
        assert_eq!(find_fit(120, 80, 3, &pallets, &config), Some((0, 0)));
        // Eine fremde Palette muss ausweichen.
        assert_eq!(find_fit(120, 80, 99, &pallets, &config), Some((0, 120)));
    }

    #[test]
    fn unplaced_pallets_do_not_block() {
        let config = PlacementConfig::default();
        let loose = fresh(5, 244, 1360);
        let pallets = vec![loose];

        assert_eq!(find_fit(244, 1360, 99, &pallets, &config), Some((0, 0)));
    }

    #[test]
    fn rotation_is_tried_after_the_nominal_orientation_fails() {
        let truck = TruckDims::new(100, 90);
        let config = PlacementConfig::builder()
            .truck(truck)
            .allow_rotation(true)
            .build();

        // Blockiert x ∈ [40, 100) über die volle Breite; frei bleibt ein
        // 40 cm kurzer Streifen, in den nur die gedrehte Lage passt.
        let wall = placed_at(0, 90, 60, 40, 0);
        let mut pallet = fresh(1, 30, 60);
        let pallets = vec![wall, pallet.clone()];

        let fit = find_fit_with_rotation(&pallet, &pallets, &config).unwrap();
        assert_eq!(
            fit,
            Fit {
                x: 0,
                y: 0,
                rotated: true
            }
        );

        // Ohne Drehungserlaubnis gibt es keinen Platz.
        let strict = PlacementConfig::builder().truck(truck).build();
        assert!(find_fit_with_rotation(&pallet, &pallets, &strict).is_none());

        // Und eine Palette, deren Länge nicht in die kurze Achse passt,
        // wird gar nicht erst gedreht.
        pallet.length = 95;
        assert!(find_fit_with_rotation(&pallet, &pallets, &config).is_none());
    }

    #[test]
    fn events_mirror_the_report() {
        let config = PlacementConfig::default();
        let mut pallets = vec![
            placed_at(0, 244, 680, 0, 0),
            placed_at(1, 244, 680, 680, 0),
            fresh(2, 10, 10),
            fresh(3, 10, 10),
        ];
        // Id 2 und 3 finden auf der vollen Fläche keinen Platz.
        let mut events = Vec::new();
        let report = place_unplaced_with_progress(&mut pallets, &config, |evt| {
            events.push(evt.clone());
        });

        assert_eq!(report.unplaced.len(), 2);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            PlacementEvent::PalletUnplaced { id: 2, .. }
        ));
        assert!(matches!(
            events[1],
            PlacementEvent::PalletUnplaced { id: 3, .. }
        ));
        assert!(matches!(
            events[2],
            PlacementEvent::Finished {
                placed: 0,
                unplaced: 2
            }
        ));
    }
}
