use std::fs;

use chanalign::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<()> {
    let dir = std::env::temp_dir().join("chanalign_roundtrip");
    fs::create_dir_all(&dir).map_err(|e| RealignError::from_io(&dir, e))?;

    // 200 channels don't fit 64-wide groups, so the last group gets 56 zero channels
    let shape = Shape::new(200, 32, 2);
    let data_path = dir.join("input_data_chw.txt");
    let mut rng = StdRng::seed_from_u64(2024);
    generate_tensor_file(&data_path, &shape.dims(), &ValueDistribution::default(), &mut rng)?;

    let config = RealignConfig {
        group_dir: dir.join("groups"),
        ..RealignConfig::new(&data_path, shape, dir.join("chw_to_hwc_result.txt"))
    };
    let manifest = run(&config)?;
    println!("{} groups written, merged into {}", manifest.len(), config.output_path.display());

    let restored = dir.join("restored_chw.txt");
    restore_file(&config.output_path, &shape, config.align, &restored)?;

    let before = read_values(&data_path)?;
    let after = read_values(&restored)?;
    println!("round trip matches: {}", before == after);

    // gather three channels straight from the merged file, no channel-first detour
    let merged = read_values(&config.output_path)?;
    let aligned = array_from_values(merged, &aligned_dims(&shape.dims(), config.align)?)?;
    let picked = gather_hwc(aligned.view(), shape.channels, &[0, 100, -1], 0)?;
    println!("gathered channels into shape {:?}", picked.shape());

    Ok(())
}
