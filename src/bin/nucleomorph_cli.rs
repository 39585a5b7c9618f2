use anyhow::{anyhow, bail, Context, Result};
use nucleomorph::{
    aggregate::Quartile,
    dataset::Dataset,
    landmark::{Landmark, ProfileType},
    nucleus::Nucleus,
    population::NucleusPopulation,
    profile::Profile,
    profile_manager::{EditReport, ProfileManager},
    segmenter,
};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use uuid::Uuid;

const DEFAULT_STATE_PATH: &str = ".nucleomorph_state.json";

#[derive(Serialize)]
struct NucleusSummary {
    id: String,
    name: String,
    length: usize,
    segmented: bool,
}

#[derive(Serialize)]
struct StateSummary {
    population: String,
    nucleus_count: usize,
    working_length: usize,
    segment_count: usize,
    has_consensus: bool,
    nuclei: Vec<NucleusSummary>,
}

#[derive(Serialize)]
struct SegmentSummary {
    id: String,
    start: usize,
    end: usize,
    total_length: usize,
    merge_source_ids: Vec<String>,
}

#[derive(Serialize)]
struct EditSummary {
    canonical: String,
    out_of_sync_nuclei: Vec<String>,
    consensus: Option<String>,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  nucleomorph_cli --version\n  \
  nucleomorph_cli [--state PATH] import-csv FILE POPULATION_NAME\n  \
  nucleomorph_cli [--state PATH] segment\n  \
  nucleomorph_cli [--state PATH] state-summary\n  \
  nucleomorph_cli [--state PATH] segments\n  \
  nucleomorph_cli [--state PATH] profile angle|diameter|radius rp|op|tv|bv 25|50|75\n  \
  nucleomorph_cli [--state PATH] move-start SEGMENT_ID INDEX\n  \
  nucleomorph_cli [--state PATH] move-end SEGMENT_ID INDEX\n  \
  nucleomorph_cli [--state PATH] merge SEGMENT_ID_A SEGMENT_ID_B\n  \
  nucleomorph_cli [--state PATH] split SEGMENT_ID [INDEX]\n  \
  nucleomorph_cli [--state PATH] unmerge SEGMENT_ID\n  \
  nucleomorph_cli [--state PATH] export-state PATH\n  \
  nucleomorph_cli [--state PATH] import-state PATH\n\n  \
  CSV rows: nucleus_name,angle_0,angle_1,..."
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn parse_global_state_arg(args: &[String]) -> (String, usize) {
    if args.len() >= 3 && args[1] == "--state" {
        return (args[2].clone(), 3);
    }
    (DEFAULT_STATE_PATH.to_string(), 1)
}

fn load_dataset(path: &str) -> Result<Dataset> {
    let mut dataset =
        Dataset::load_from_path(path).with_context(|| format!("Could not load state '{path}'"))?;
    dataset.rebuild().context("Could not rebuild aggregates")?;
    Ok(dataset)
}

fn parse_profile_type(text: &str) -> Result<ProfileType> {
    match text {
        "angle" => Ok(ProfileType::Angle),
        "diameter" => Ok(ProfileType::Diameter),
        "radius" => Ok(ProfileType::Radius),
        _ => Err(anyhow!("Unknown profile type '{text}'")),
    }
}

fn parse_landmark(text: &str) -> Result<Landmark> {
    match text {
        "rp" => Ok(Landmark::ReferencePoint),
        "op" => Ok(Landmark::OrientationPoint),
        "tv" => Ok(Landmark::TopVertical),
        "bv" => Ok(Landmark::BottomVertical),
        _ => Err(anyhow!("Unknown landmark '{text}'")),
    }
}

fn parse_quartile(text: &str) -> Result<Quartile> {
    match text {
        "25" => Ok(Quartile::Lower),
        "50" => Ok(Quartile::Median),
        "75" => Ok(Quartile::Upper),
        _ => Err(anyhow!("Unknown quartile '{text}', expected 25, 50 or 75")),
    }
}

fn parse_segment_id(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).with_context(|| format!("Invalid segment id '{text}'"))
}

fn import_csv(path: &str, name: &str) -> Result<NucleusPopulation> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Could not read CSV '{path}'"))?;

    let mut nuclei = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Bad CSV record in '{path}'"))?;
        let mut fields = record.iter();
        let nucleus_name = fields
            .next()
            .ok_or_else(|| anyhow!("Row {row} is empty"))?
            .to_string();
        let values: Vec<f64> = fields
            .map(|f| {
                f.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Row {row}: bad value '{f}'"))
            })
            .collect::<Result<_>>()?;
        let profile =
            Profile::new(values).with_context(|| format!("Row {row} ({nucleus_name})"))?;
        let mut profiles = HashMap::new();
        profiles.insert(ProfileType::Angle, profile);
        let nucleus = Nucleus::new(&nucleus_name, profiles)
            .with_context(|| format!("Row {row} ({nucleus_name})"))?;
        nuclei.push(nucleus);
    }
    Ok(NucleusPopulation::new(name, nuclei)?)
}

fn summarize_state(dataset: &Dataset) -> StateSummary {
    let population = &dataset.population;
    StateSummary {
        population: population.name().to_string(),
        nucleus_count: population.size(),
        working_length: population.collection().length(),
        segment_count: population.collection().segment_count(),
        has_consensus: population.has_consensus(),
        nuclei: population
            .nuclei()
            .iter()
            .map(|n| NucleusSummary {
                id: n.id().to_string(),
                name: n.name().to_string(),
                length: n.native_length(),
                segmented: n.has_segments(),
            })
            .collect(),
    }
}

fn summarize_edit(report: &EditReport) -> EditSummary {
    EditSummary {
        canonical: match &report.canonical {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        },
        out_of_sync_nuclei: report
            .failed_nuclei()
            .iter()
            .map(|id| id.to_string())
            .collect(),
        consensus: report.consensus.as_ref().map(|r| match r {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        }),
    }
}

fn run_edit(state_path: &str, edit: impl FnOnce(&mut ProfileManager) -> EditReport) -> Result<()> {
    let mut dataset = load_dataset(state_path)?;
    let mut manager = ProfileManager::new(&mut dataset.population);
    let report = edit(&mut manager);
    if report.canonical_succeeded() {
        dataset.save_to_path(state_path)?;
    }
    print_json(&summarize_edit(&report))
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .env()
        .init()
        .ok();
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        bail!("Missing command");
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("nucleomorph_cli {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (state_path, cmd_idx) = parse_global_state_arg(&args);
    if args.len() <= cmd_idx {
        usage();
        bail!("Missing command");
    }

    let command = &args[cmd_idx];

    match command.as_str() {
        "import-csv" => {
            if args.len() <= cmd_idx + 2 {
                usage();
                bail!("import-csv requires: FILE POPULATION_NAME");
            }
            let file = &args[cmd_idx + 1];
            let name = &args[cmd_idx + 2];
            let population = import_csv(file, name)?;
            let count = population.size();
            let dataset = Dataset::new(population);
            dataset.save_to_path(&state_path)?;
            println!("Imported {count} nuclei from '{file}' into '{state_path}'");
            Ok(())
        }
        "segment" => {
            let mut dataset = load_dataset(&state_path)?;
            segmenter::segment_population(&mut dataset.population, &HashMap::new())?;
            dataset.save_to_path(&state_path)?;
            println!(
                "Segmented median profile into {} segments",
                dataset.population.collection().segment_count()
            );
            Ok(())
        }
        "state-summary" => {
            let dataset = load_dataset(&state_path)?;
            print_json(&summarize_state(&dataset))
        }
        "segments" => {
            let dataset = load_dataset(&state_path)?;
            let segments: Vec<SegmentSummary> = dataset
                .population
                .collection()
                .segments(Landmark::ReferencePoint)?
                .iter()
                .map(|s| SegmentSummary {
                    id: s.id().to_string(),
                    start: s.start_index(),
                    end: s.end_index(),
                    total_length: s.total_length(),
                    merge_source_ids: s
                        .merge_source_ids()
                        .iter()
                        .map(|id| id.to_string())
                        .collect(),
                })
                .collect();
            print_json(&segments)
        }
        "profile" => {
            if args.len() <= cmd_idx + 3 {
                usage();
                bail!("profile requires: TYPE LANDMARK QUARTILE");
            }
            let profile_type = parse_profile_type(&args[cmd_idx + 1])?;
            let landmark = parse_landmark(&args[cmd_idx + 2])?;
            let quartile = parse_quartile(&args[cmd_idx + 3])?;
            let mut dataset = load_dataset(&state_path)?;
            let profile = dataset
                .population
                .collection_mut()
                .profile(profile_type, landmark, quartile)?;
            print_json(&profile.values())
        }
        "move-start" | "move-end" => {
            if args.len() <= cmd_idx + 2 {
                usage();
                bail!("{command} requires: SEGMENT_ID INDEX");
            }
            let id = parse_segment_id(&args[cmd_idx + 1])?;
            let index: usize = args[cmd_idx + 2].parse().context("Bad index")?;
            let move_start = command == "move-start";
            run_edit(&state_path, |manager| {
                manager.update_median_profile_segment_index(move_start, id, index)
            })
        }
        "merge" => {
            if args.len() <= cmd_idx + 2 {
                usage();
                bail!("merge requires: SEGMENT_ID_A SEGMENT_ID_B");
            }
            let id_a = parse_segment_id(&args[cmd_idx + 1])?;
            let id_b = parse_segment_id(&args[cmd_idx + 2])?;
            run_edit(&state_path, |manager| manager.merge_segments(id_a, id_b))
        }
        "split" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                bail!("split requires: SEGMENT_ID [INDEX]");
            }
            let id = parse_segment_id(&args[cmd_idx + 1])?;
            let index = match args.get(cmd_idx + 2) {
                Some(text) => Some(text.parse::<usize>().context("Bad index")?),
                None => None,
            };
            run_edit(&state_path, |manager| manager.split_segment(id, index))
        }
        "unmerge" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                bail!("unmerge requires: SEGMENT_ID");
            }
            let id = parse_segment_id(&args[cmd_idx + 1])?;
            run_edit(&state_path, |manager| manager.unmerge_segments(id))
        }
        "export-state" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                bail!("Missing path for export-state");
            }
            let target = &args[cmd_idx + 1];
            let dataset = load_dataset(&state_path)?;
            dataset.save_to_path(target)?;
            println!("Saved dataset from '{state_path}' to '{target}'");
            Ok(())
        }
        "import-state" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                bail!("Missing path for import-state");
            }
            let source = &args[cmd_idx + 1];
            let dataset = Dataset::load_from_path(source)?;
            dataset.save_to_path(&state_path)?;
            println!("Loaded dataset from '{source}' into '{state_path}'");
            Ok(())
        }
        other => {
            usage();
            Err(anyhow!("Unknown command '{other}'"))
        }
    }
}
