//! Solidus report: runs the solidify operation on a fixture mesh and prints
//! the output sizes, the enclosed volume and every warning.
//!
//! Usage:
//! ```text
//! cargo run --example report                        # default (grid)
//! cargo run --example report -- fin                 # fixture by name
//! cargo run --example report -- box --thickness 0.2
//! ```

use solidus::math::Point3;
use solidus::mesh::Mesh;
use solidus::operations::creation::{MakeBox, MakeGrid, MakeMesh};
use solidus::operations::modification::{PolygonKind, Solidify, SolidifyParams};
use solidus::operations::query::{BoundingBox, EdgeUsage, Volume};
use solidus::Result;

const FIXTURES: &[&str] = &["grid", "strip", "box", "fin", "duplicate"];

/// Parsed CLI arguments.
struct CliArgs {
    fixture: String,
    thickness: f64,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let thickness = args
        .iter()
        .position(|a| a == "--thickness")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.1);
    let fixture = args
        .iter()
        .find(|a| !a.starts_with('-') && a.parse::<f64>().is_err())
        .cloned()
        .unwrap_or_else(|| "grid".to_string());
    CliArgs { fixture, thickness }
}

fn p(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

fn fixture(name: &str) -> Result<Option<Mesh>> {
    let mesh = match name {
        "grid" => MakeGrid::new(4, 4, 2.0, 2.0).execute()?,
        "strip" => MakeGrid::new(2, 1, 2.0, 1.0).execute()?,
        "box" => MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute()?,
        "fin" => MakeMesh::new(
            vec![
                p(0.0, 0.0, 0.0),
                p(0.0, 0.0, 1.0),
                p(1.0, 0.0, 0.0),
                p(1.0, 0.0, 1.0),
                p(-0.5, 0.8, 0.0),
                p(-0.5, 0.8, 1.0),
                p(-0.5, -0.8, 0.0),
                p(-0.5, -0.8, 1.0),
            ],
            vec![vec![0, 2, 3, 1], vec![0, 1, 5, 4], vec![0, 6, 7, 1]],
        )
        .execute()?,
        "duplicate" => MakeMesh::new(
            vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
            vec![vec![0, 1, 2], vec![0, 2, 1]],
        )
        .execute()?,
        _ => return Ok(None),
    };
    Ok(Some(mesh))
}

fn main() -> Result<()> {
    // Default: WARN for everything, INFO for solidus.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("solidus=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = parse_args();
    let Some(mesh) = fixture(&args.fixture)? else {
        eprintln!("[report] unknown fixture: {}", args.fixture);
        eprintln!("[report] available: {}", FIXTURES.join(", "));
        return Ok(());
    };

    let params = SolidifyParams::new(args.thickness).with_rim(args.fixture != "box");
    let out = Solidify::new(params).execute(&mesh)?;

    let usage = EdgeUsage::new().execute(&out.mesh)?;
    let bounds = BoundingBox::new().execute(&out.mesh)?;
    let rims = out
        .sources
        .polygon_kinds
        .iter()
        .filter(|k| matches!(k, PolygonKind::Rim))
        .count();
    let closures = out
        .sources
        .polygon_kinds
        .iter()
        .filter(|k| matches!(k, PolygonKind::Closure))
        .count();

    println!("fixture    {}", args.fixture);
    println!(
        "input      {} verts, {} edges, {} polygons",
        mesh.vertex_count(),
        mesh.edge_count(),
        mesh.polygon_count()
    );
    println!(
        "output     {} verts, {} edges, {} polygons ({rims} rim, {closures} closure)",
        out.mesh.vertex_count(),
        out.mesh.edge_count(),
        out.mesh.polygon_count()
    );
    println!(
        "edges      {} manifold, {} boundary, {} non-manifold",
        usage.manifold, usage.boundary, usage.non_manifold
    );
    println!("bounds     {:?} .. {:?}", bounds.min, bounds.max);
    if usage.is_closed_manifold() {
        println!("volume     {:.6}", Volume::new().execute(&out.mesh)?.abs());
    }
    for warning in &out.warnings {
        println!("warning    {warning}");
    }
    Ok(())
}
