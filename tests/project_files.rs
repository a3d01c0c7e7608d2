use msx_tile_editor::{
    bank::{HUD_BANK, MAIN_BANK},
    codec::{self, NumberFormat},
    common::{Color, Point, ScreenMode},
    draw::{apply_tool, Brush, DrawingTool},
    persist,
    project::Project,
    symmetry::SymmetrySettings,
    tile::{LineAttribute, Tile},
};

fn sample_tile(id: &str, name: &str) -> Tile {
    let attr = LineAttribute::new(Color::new("#FC5554"), Color::new("#000000"));
    Tile::new_constrained(id, name, 16, 16, attr).unwrap()
}

#[test]
fn test_project_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = Project::default();
    let mut tile = sample_tile("t1", "brick wall");
    let sym = SymmetrySettings {
        horizontal: true,
        ..Default::default()
    };
    apply_tool(
        &mut tile,
        DrawingTool::Pencil,
        Point::new(1, 1),
        true,
        &sym,
        &Brush::default(),
    )
    .unwrap();
    project.add_tile(tile).unwrap();
    project.add_tile(sample_tile("t2", "floor")).unwrap();
    project.assign(MAIN_BANK, "t1").unwrap();
    project.set_bank_enabled(HUD_BANK, false).unwrap();

    persist::save_project_dir(dir.path(), &project).unwrap();
    assert!(dir.path().join("Tiles/brick_wall.t1.json").exists());
    assert!(dir.path().join("banks.json").exists());

    let loaded = persist::load_project_dir(dir.path()).unwrap();
    assert_eq!(loaded.tiles.len(), 2);
    let brick = loaded.tile("t1").unwrap();
    assert_eq!(brick, project.tile("t1").unwrap());
    assert_eq!(brick.pixel(14, 1).unwrap(), &Color::new("#000000"));
    assert_eq!(loaded.banks, project.banks);
    assert!(!loaded.banks.bank(HUD_BANK).unwrap().enabled);

    persist::delete_tile(dir.path(), brick).unwrap();
    assert!(!dir.path().join("Tiles/brick_wall.t1.json").exists());
}

#[test]
fn test_missing_banks_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = persist::load_project_dir(dir.path()).unwrap();
    assert!(loaded.tiles.is_empty());
    assert_eq!(loaded.banks.banks.len(), 3);
}

#[test]
fn test_tileset_import_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("set.json");
    std::fs::write(
        &path,
        r##"{"tiles": [
            {"id": "a", "name": "a", "width": 8, "height": 8},
            {"id": "b", "name": "b", "width": 16, "height": 8,
             "lineAttributes": [[{"fg": "#21C842", "bg": "#000000"}, {"fg": "#21C842", "bg": "#000000"}]]}
        ]}"##,
    )
    .unwrap();
    let tiles = persist::load_tileset(&path, Some(ScreenMode::Screen2)).unwrap();
    assert_eq!(tiles.len(), 2);
    // "b" has one attribute row for eight pixel rows, so it gets defaults
    assert_eq!(
        tiles[1].attribute(7, 1),
        Some(&LineAttribute::default())
    );

    let out = dir.path().join("copy.json");
    persist::save_tileset(&out, &tiles).unwrap();
    let again = persist::load_tileset(&out, None).unwrap();
    assert_eq!(again, tiles);

    let asm = codec::tileset_assembly_text(&again, &Project::default(), NumberFormat::Decimal);
    assert!(asm.contains(";; Pattern data for A\n"));
    assert_eq!(codec::all_pattern_bytes(&again).len(), 8 + 16);

    let bin = dir.path().join("out/all_colors.bin");
    persist::write_binary(&bin, &codec::all_color_bytes(&again)).unwrap();
    assert_eq!(std::fs::read(&bin).unwrap(), vec![0xF1; 24]);
}
