use std::io::Write;

use vantage::importer;
use vantage::scene::{Label, MeshComponent, Scene};
use vantage::{Editor, Input, RecordingRenderer, RenderCall};

const QUAD: &str = "solid quad
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 1 1 0
  endloop
endfacet
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 1 0
    vertex 0 1 0
  endloop
endfacet
endsolid quad
";

fn stl_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("panel")
        .suffix(".stl")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn imported_stl_lands_in_its_own_group() {
    let file = stl_file(QUAD);
    let mut scene = Scene::new();
    scene.create_entity("Existing");

    let entities = importer::import_into(&mut scene, file.path()).unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(scene.len(), 2);

    let group = scene.component::<Label>(entities[0]).group_id;
    assert_ne!(group, 0);
    let stem = file.path().file_stem().unwrap().to_str().unwrap();
    assert_eq!(scene.group_name(group), stem);

    let mesh = scene.component::<MeshComponent>(entities[0]);
    assert_eq!(mesh.geometry.vertices().len(), 6);
}

#[test]
fn importing_twice_keeps_names_unique() {
    let file = stl_file(QUAD);
    let mut scene = Scene::new();

    let first = importer::import_into(&mut scene, file.path()).unwrap();
    let second = importer::import_into(&mut scene, file.path()).unwrap();
    assert_ne!(scene.name(first[0]), scene.name(second[0]));
    assert_eq!(scene.groups().len(), 3);
}

#[test]
fn broken_file_is_reported_and_scene_is_untouched() {
    let file = stl_file("solid broken\nfacet normal 0 0 1\n  outer loop\n    vertex 0 0\n");
    let mut scene = Scene::new();

    assert!(!importer::import_model(&mut scene, file.path()));
    assert!(scene.is_empty());
    assert_eq!(scene.groups().len(), 1);
}

#[test]
fn imported_mesh_is_drawn_in_both_passes() {
    let file = stl_file(QUAD);
    let mut editor = Editor::new(Scene::new());
    assert!(importer::import_model(editor.scene_mut(), file.path()));

    let mut renderer = RecordingRenderer::new(1, 1);
    let ctx = egui::Context::default();
    let input = Input::new();
    let mut result = Ok(());
    let _ = ctx.run(egui::RawInput::default(), |ctx| {
        result = editor.frame(ctx, &input, &mut renderer, 0.016);
    });
    result.unwrap();

    let passes = renderer.passes();
    assert!(matches!(passes[0], RenderCall::DepthPass { casters: 1 }));
    assert!(matches!(passes[1], RenderCall::ColorPass { items: 1, .. }));
}
