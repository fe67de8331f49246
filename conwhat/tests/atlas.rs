mod common;

use common::{expected_volume, toy3, toy3_variant, TOY3};
use conwhat::prelude::*;
use ndarray::Array2;

#[test]
fn test_open_every_kind() {
    let toy = toy3();
    for kind in AtlasKind::ALL {
        let atlas = Atlas::open(kind, TOY3, &toy.loader).unwrap();
        assert_eq!(atlas.kind(), kind);
        assert_eq!(atlas.name(), TOY3);
        assert_eq!(atlas.len(), 3);
        assert_eq!(atlas.connectivity().is_some(), kind.has_connectivity());
        assert_eq!(atlas.as_vol().is_some(), kind.is_volumetric());
    }

    let atlas = Atlas::vol_conn(TOY3, &toy.loader).unwrap();
    let vol = atlas.as_vol().unwrap();
    assert!(vol.vfms().idxs().eq(vol.bbox().idxs()));
    assert_eq!(atlas.graph().unwrap().n_connections(), 3);
}

#[test]
fn test_unknown_atlas() {
    let toy = toy3();
    for kind in AtlasKind::ALL {
        let err = Atlas::open(kind, "toy4", &toy.loader).unwrap_err();
        assert!(matches!(err, LoadError::UnknownAtlas { .. }), "{err}");
    }
}

#[test]
fn test_get_volume() {
    let toy = toy3();
    let atlas = Atlas::vol_conn(TOY3, &toy.loader).unwrap();

    let v = atlas.get_volume(1).unwrap();
    assert_eq!(v.shape(), (4, 4, 4));
    assert_eq!(v.data(), expected_volume(1));
    assert_eq!(v[(3, 3, 3)], 2.0);
    // 取出的单个体积记录为 3D 图像.
    assert_eq!((v.header().dim[0], v.header().dim[4]), (3, 1));

    // 多次读取结果一致.
    assert_eq!(atlas.get_volume(1).unwrap(), v);

    let err = atlas.get_volume(7).unwrap_err();
    assert!(matches!(err, AtlasError::EntryNotFound { idx: 7, .. }));
}

#[test]
fn test_get_volume_for_region_pair() {
    let toy = toy3();
    let atlas = Atlas::vol_conn(TOY3, &toy.loader).unwrap();

    let edge = atlas.graph().unwrap().connection(0, 2).unwrap();
    assert_eq!(edge.idx, 2);
    assert_eq!(edge.weight, 2.0);

    let v = atlas.get_volume_for_region_pair(0, 2).unwrap();
    assert_eq!(v.data(), expected_volume(2));
    assert_eq!(v, atlas.get_volume(edge.idx).unwrap());
    assert_eq!(atlas.get_volume_for_region_pair(2, 0).unwrap(), v);

    for (a, b) in [(1, 1), (0, 5)] {
        let err = atlas.get_volume_for_region_pair(a, b).unwrap_err();
        assert!(matches!(err, AtlasError::EdgeNotFound { .. }), "{err}");
    }
}

#[test]
fn test_missing_file_names_both_paths() {
    let toy = toy3_variant("broken", |dir| {
        std::fs::write(
            dir.join("vfms.csv"),
            "idx,name,nii_file,4dvolind\n0,0_1,cnxns.nii,0\n1,1_2,nope.nii,1\n2,0_2,cnxns.nii,2\n",
        )
        .unwrap();
    });
    let atlas = Atlas::vol_tract("broken", &toy.loader).unwrap();
    assert!(atlas.get_volume(0).is_ok());

    match atlas.get_volume(1).unwrap_err() {
        AtlasError::FileNotFound { idx, tried, .. } => {
            assert_eq!(idx, 1);
            assert_eq!(
                tried,
                vec![std::path::PathBuf::from("nope.nii"), toy.dir("broken").join("nope.nii")]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_misaligned_bboxes() {
    let toy = toy3_variant("short", |dir| {
        std::fs::write(
            dir.join("bboxes.csv"),
            "idx,xmin,xmax,ymin,ymax,zmin,zmax\n0,0,1,0,0,0,0\n2,1,1,1,2,1,1\n",
        )
        .unwrap();
    });
    let err = Atlas::vol_tract("short", &toy.loader).unwrap_err();
    assert!(matches!(err, LoadError::Misaligned { .. }), "{err}");
}

#[test]
fn test_unsupported_operations() {
    let toy = toy3();
    let stream = Atlas::stream_tract(TOY3, &toy.loader).unwrap();
    assert!(matches!(
        stream.get_volume(0),
        Err(AtlasError::UnsupportedOperation {
            op: "get_volume",
            kind: AtlasKind::StreamTract
        })
    ));

    let mut tract = Atlas::vol_tract(TOY3, &toy.loader).unwrap();
    assert!(matches!(
        tract.get_volume_for_region_pair(0, 2),
        Err(AtlasError::UnsupportedOperation { .. })
    ));
    assert!(matches!(
        tract.modify_connectome(None, |c| c.weights.to_owned()),
        Err(AtlasError::UnsupportedOperation { .. })
    ));
}

#[test]
fn test_hit_stats() {
    let toy = toy3();
    let atlas = Atlas::vol_conn(TOY3, &toy.loader).unwrap();
    let roi = Roi::from_voxels((4, 4, 4), [(1, 1, 1), (1, 1, 2)]).unwrap();

    let serial = atlas
        .compute_hit_stats(&roi, &[2, 0, 1], 1, &RunType::default())
        .unwrap();
    let parallel = atlas
        .compute_hit_stats(&roi, &[2, 0, 1], 2, &RunType::new("full"))
        .unwrap();
    assert_eq!(serial.table.records(), parallel.table.records());
    assert_eq!(parallel.table.run_type().as_str(), "full");

    let order: Vec<_> = serial.table.iter().map(|r| r.idx).collect();
    assert_eq!(order, vec![2, 0, 1]);

    let hit = serial.table.get(2).unwrap();
    assert_eq!((hit.hits, hit.entry_voxels, hit.roi_voxels), (1, Some(2), 2));
    assert_eq!(hit.dice, 0.5);
    assert_eq!(serial.table.get(0).unwrap().entry_voxels, None);

    let graph = serial.graph.unwrap();
    assert_eq!(graph.connection(0, 2).unwrap().hit.as_ref(), Some(hit));
    assert!(atlas.graph().unwrap().connection(0, 2).unwrap().hit.is_none());

    let tract = Atlas::vol_tract(TOY3, &toy.loader).unwrap();
    let outcome = tract.compute_hit_stats(&roi, &[2], 1, &RunType::default()).unwrap();
    assert!(outcome.graph.is_none());
    assert_eq!(outcome.table.ranked_by(HitMetric::Dice)[0].idx, 2);
}

#[test]
fn test_scalar_stats_overwrite() {
    let toy = toy3();
    let mut atlas = Atlas::vol_tract(TOY3, &toy.loader).unwrap();
    let fa = toy.dir(TOY3).join("fa.nii");

    let first = atlas
        .compute_scalar_stats(&ScalarParams::new(&fa, vec![2]), "fa")
        .unwrap();
    let rec = first.get(2).unwrap();
    assert_eq!(rec.voxels, 2);
    assert!((rec.mean.unwrap() - 0.25).abs() < 1e-6);

    atlas
        .compute_scalar_stats(&ScalarParams::new(&fa, vec![0]), "fa")
        .unwrap();
    let cached = atlas.scalar_stats("fa").unwrap();
    assert_eq!(cached.len(), 1);
    assert!(cached.get(2).is_none());
    assert!((cached.get(0).unwrap().max.unwrap() - 0.1).abs() < 1e-6);

    let names: Vec<_> = atlas.as_vol().unwrap().scalar_stats_names().collect();
    assert_eq!(names, ["fa"]);
}

#[test]
fn test_modify_connectome() {
    let toy = toy3();
    let mut atlas = Atlas::vol_conn(TOY3, &toy.loader).unwrap();

    let mc = atlas
        .modify_connectome(None, |c| c.weights.mapv(|w| w * 10.0))
        .unwrap();
    assert_eq!(mc.weights()[(1, 2)], 30.0);
    assert!(atlas.modcon(DEFAULT_MODCON_NAME).is_some());

    let err = atlas
        .modify_connectome(Some("bad"), |_| Array2::zeros((2, 3)))
        .unwrap_err();
    assert!(matches!(err, AtlasError::ShapeMismatch { .. }));
    assert!(atlas.modcon("bad").is_none());

    let roi = Roi::from_voxels((4, 4, 4), [(1, 1, 1)]).unwrap();
    let hits = atlas
        .compute_hit_stats(&roi, &[0, 1, 2], 1, &RunType::default())
        .unwrap()
        .table;
    let masked = atlas
        .modify_connectome(Some("masked"), mask_by_hits(&hits))
        .unwrap();
    assert_eq!(masked.weights()[(0, 2)], 2.0);
    assert_eq!(masked.weights()[(0, 1)], 0.0);

    let mut stream = Atlas::stream_conn(TOY3, &toy.loader).unwrap();
    stream
        .modify_connectome(Some("mc2"), |c| c.weights.to_owned())
        .unwrap();
    assert!(stream.modcon("mc2").is_some());
}

#[test]
fn test_plots() {
    let toy = toy3();
    let out = toy.root.path().join("plots");
    let mut plotter = PngPlotter::new(&out);

    let atlas = Atlas::vol_conn(TOY3, &toy.loader).unwrap();
    atlas.plot_network(&mut plotter).unwrap();
    atlas.plot_matrix(&mut plotter).unwrap();
    atlas
        .plot_connection_and_regions(Some(0), Some(2), None, &mut plotter)
        .unwrap();
    atlas
        .plot_connection_and_regions(None, None, Some(1), &mut plotter)
        .unwrap();

    for (a, b, i) in [(Some(0), None, None), (Some(0), Some(2), Some(2)), (None, None, None)] {
        let err = atlas
            .plot_connection_and_regions(a, b, i, &mut plotter)
            .unwrap_err();
        assert!(matches!(err, AtlasError::Precondition(_)), "{err}");
    }

    let tract = Atlas::vol_tract(TOY3, &toy.loader).unwrap();
    tract.plot_tract(2, &mut plotter).unwrap();
    assert!(tract.plot_network(&mut plotter).is_err());

    let stream = Atlas::stream_conn(TOY3, &toy.loader).unwrap();
    stream.plot_connections(&mut plotter).unwrap();

    let names: Vec<_> = plotter
        .written()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        [
            "toy3_network.png",
            "toy3_matrix.png",
            "toy3_cnxn_0_2.png",
            "toy3_cnxn_1.png",
            "toy3_tract_2.png",
            "toy3_stream_cnxns.png",
        ]
    );
    assert!(plotter.written().iter().all(|p| p.is_file()));
}
