use anyhow::{Context, Result, bail};
use clap::Parser;
use globset::{Glob, GlobMatcher};
use macho_inspect::{
    BinaryData, Cli, Commands, ImageReport, JsonFormatter, OutputFormat, Report, TableFormatter,
    logging,
};
use std::path::Path;

/// Configuration for the inspect command
struct InspectConfig<'a> {
    binary_path: &'a Path,
    output_format: OutputFormat,
    arch: Option<&'a str>,
    show_sections: bool,
    no_color: bool,
    pretty: bool,
}

/// Configuration for the symbols command
struct SymbolsConfig<'a> {
    binary_path: &'a Path,
    output_format: OutputFormat,
    arch: Option<&'a str>,
    filter: Option<&'a str>,
    show_strings: bool,
    no_color: bool,
    pretty: bool,
}

fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inspect { binary, output, arch, no_sections, no_color, pretty } => {
            logging::init_tracing(no_color);
            let config = InspectConfig {
                binary_path: &binary,
                output_format: output,
                arch: arch.as_deref(),
                show_sections: !no_sections,
                no_color,
                pretty,
            };
            run_inspect(&config)?;
        }
        Commands::Symbols { binary, output, arch, filter, strings, no_color, pretty } => {
            logging::init_tracing(no_color);
            let config = SymbolsConfig {
                binary_path: &binary,
                output_format: output,
                arch: arch.as_deref(),
                filter: filter.as_deref(),
                show_strings: strings,
                no_color,
                pretty,
            };
            run_symbols(&config)?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli)
}

fn load_report(binary_path: &Path, arch: Option<&str>) -> Result<Report> {
    let binary = BinaryData::load(binary_path)
        .with_context(|| format!("Failed to load binary: {}", binary_path.display()))?;

    let mut report = binary
        .inspect()
        .with_context(|| format!("Failed to parse Mach-O file: {}", binary_path.display()))?;

    if let Some(arch) = arch {
        select_arch(&mut report, arch)?;
    }

    Ok(report)
}

/// Keeps only the images built for `arch`, and the fat architecture entries
/// they came from.
fn select_arch(report: &mut Report, arch: &str) -> Result<()> {
    // Images whose header could not be read fall back to the fat entry's cputype.
    let cpu_of = |image: &ImageReport| {
        image.cpu_name().or_else(|| {
            let fat = report.fat.as_ref()?;
            fat.architectures.iter().find(|a| Some(a.index) == image.arch_index).map(|a| a.cpu_name)
        })
    };
    let mut available: Vec<&'static str> = report.images.iter().filter_map(cpu_of).collect();
    available.dedup();
    let keep: Vec<bool> = report
        .images
        .iter()
        .map(|i| cpu_of(i).is_some_and(|cpu| cpu.eq_ignore_ascii_case(arch)))
        .collect();

    let mut keep = keep.into_iter();
    report.images.retain(|_| keep.next().unwrap_or(false));

    if report.images.is_empty() {
        bail!(
            "No image for architecture '{}' (available: {})",
            arch,
            if available.is_empty() { "none".to_string() } else { available.join(", ") }
        );
    }

    let kept: Vec<usize> = report.images.iter().filter_map(|i| i.arch_index).collect();
    if let Some(ref mut fat) = report.fat {
        fat.architectures.retain(|a| kept.contains(&a.index));
    }
    Ok(())
}

/// Fails after output has been printed when any sub-structure could not be decoded.
fn check_diagnostics(report: &Report) -> Result<()> {
    if report.has_diagnostics() {
        bail!("Some structures could not be decoded; see the reported decoding errors");
    }
    Ok(())
}

fn run_inspect(config: &InspectConfig<'_>) -> Result<()> {
    let mut report = load_report(config.binary_path, config.arch)?;
    let path = config.binary_path.display().to_string();

    for image in &mut report.images {
        image.symbols.clear();
        image.strings.clear();
        if !config.show_sections {
            for segment in &mut image.segments {
                segment.sections.clear();
            }
        }
    }

    let output_str = match config.output_format {
        OutputFormat::Table => {
            let formatter = TableFormatter::new(config.no_color);
            formatter.format_inspect(&path, &report, config.show_sections)
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(config.pretty);
            formatter.format(&path, &report)
        }
    };

    println!("{}", output_str);

    check_diagnostics(&report)
}

fn run_symbols(config: &SymbolsConfig<'_>) -> Result<()> {
    let mut report = load_report(config.binary_path, config.arch)?;
    let path = config.binary_path.display().to_string();

    let matcher: Option<GlobMatcher> = config
        .filter
        .map(|f| Glob::new(f).map(|g| g.compile_matcher()))
        .transpose()
        .with_context(|| format!("Invalid symbol filter: {}", config.filter.unwrap_or("")))?;

    for image in &mut report.images {
        image.load_commands.clear();
        image.segments.clear();
        if !config.show_strings {
            image.strings.clear();
        }
        if let Some(ref m) = matcher {
            image.symbols.retain(|s| m.is_match(&s.name));
        }
    }

    if matcher.is_some() && report.images.iter().all(|i| i.symbols.is_empty()) {
        eprintln!("No symbols match filter: {}", config.filter.unwrap_or(""));
    }

    let output_str = match config.output_format {
        OutputFormat::Table => {
            let formatter = TableFormatter::new(config.no_color);
            formatter.format_symbols(&path, &report, config.show_strings)
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(config.pretty);
            formatter.format(&path, &report)
        }
    };

    println!("{}", output_str);

    check_diagnostics(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macho_inspect::macho::{Endianness, Kind};
    use macho_inspect::{ArchReport, FatReport};
    use std::io::Write;

    /// Minimal 64-bit little-endian executable with one `__TEXT` segment.
    fn write_thin_fixture() -> tempfile::NamedTempFile {
        let mut data = Vec::new();
        for word in [0xfeed_facfu32, 0x0100_000c, 0, 2, 1, 72, 0, 0] {
            data.extend_from_slice(&word.to_le_bytes());
        }
        data.extend_from_slice(&0x19u32.to_le_bytes());
        data.extend_from_slice(&72u32.to_le_bytes());
        data.extend_from_slice(b"__TEXT\0\0\0\0\0\0\0\0\0\0");
        data.extend_from_slice(&[0u8; 48]);

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&data).expect("write fixture");
        file.flush().expect("flush fixture");
        file
    }

    #[test]
    fn run_inspect_outputs() {
        let file = write_thin_fixture();
        let base = InspectConfig {
            binary_path: file.path(),
            output_format: OutputFormat::Table,
            arch: None,
            show_sections: true,
            no_color: true,
            pretty: true,
        };

        run_inspect(&base).expect("inspect table");
        let json_cfg = InspectConfig { output_format: OutputFormat::Json, ..base };
        run_inspect(&json_cfg).expect("inspect json");
        let arch_cfg = InspectConfig { arch: Some("ARM64"), ..json_cfg };
        run_inspect(&arch_cfg).expect("inspect with arch");
    }

    #[test]
    fn run_inspect_wrong_arch_fails() {
        let file = write_thin_fixture();
        let config = InspectConfig {
            binary_path: file.path(),
            output_format: OutputFormat::Table,
            arch: Some("x86_64"),
            show_sections: false,
            no_color: true,
            pretty: false,
        };
        let err = run_inspect(&config).expect_err("arch mismatch should fail");
        assert!(err.to_string().contains("available: arm64"));
    }

    #[test]
    fn select_arch_filters_fat_entries() {
        let arch = |index: usize, cputype: u32, cpu_name: &'static str| ArchReport {
            index,
            cputype,
            cpu_name,
            cpusubtype: 0,
            offset: 0x4000 * (index as u64 + 1),
            size: 0x100,
            align: 14,
        };
        let mut report = Report {
            kind: Kind::Fat,
            fat: Some(FatReport {
                magic: 0xcafe_babe,
                endian: Endianness::Big,
                nfat_arch: 2,
                architectures: vec![arch(0, 0x0100_0007, "x86_64"), arch(1, 0x0100_000c, "arm64")],
            }),
            // Headerless images fall back to the fat entry's cputype.
            images: vec![ImageReport::new(Some(0), 0x4000), ImageReport::new(Some(1), 0x8000)],
        };

        select_arch(&mut report, "arm64").expect("arm64 slice present");
        assert_eq!(report.images.len(), 1);
        assert_eq!(report.images[0].arch_index, Some(1));
        let fat = report.fat.as_ref().expect("fat report");
        assert_eq!(fat.architectures.len(), 1);
        assert_eq!(fat.architectures[0].index, 1);

        let err = select_arch(&mut report, "powerpc").expect_err("no powerpc slice");
        assert!(err.to_string().contains("available: arm64"));
    }

    #[test]
    fn run_symbols_outputs() {
        let file = write_thin_fixture();
        let base = SymbolsConfig {
            binary_path: file.path(),
            output_format: OutputFormat::Table,
            arch: None,
            filter: Some("_m*"),
            show_strings: true,
            no_color: true,
            pretty: false,
        };

        run_symbols(&base).expect("symbols table");
        let json_cfg = SymbolsConfig { output_format: OutputFormat::Json, ..base };
        run_symbols(&json_cfg).expect("symbols json");
    }

    #[test]
    fn run_symbols_invalid_glob() {
        let file = write_thin_fixture();
        let config = SymbolsConfig {
            binary_path: file.path(),
            output_format: OutputFormat::Table,
            arch: None,
            filter: Some("[unclosed"),
            show_strings: false,
            no_color: true,
            pretty: false,
        };
        assert!(run_symbols(&config).is_err());
    }

    #[test]
    fn run_inspect_missing_file() {
        let config = InspectConfig {
            binary_path: Path::new("/nonexistent/macho-inspect-fixture"),
            output_format: OutputFormat::Table,
            arch: None,
            show_sections: true,
            no_color: true,
            pretty: false,
        };
        let err = run_inspect(&config).expect_err("missing file should fail");
        assert!(err.to_string().contains("Failed to load binary"));
    }

    #[test]
    fn run_inspect_truncated_reports_and_fails() {
        let file = write_thin_fixture();
        let data = std::fs::read(file.path()).expect("read fixture");
        let mut short = tempfile::NamedTempFile::new().expect("temp file");
        short.write_all(&data[..data.len() - 4]).expect("write");
        short.flush().expect("flush");

        let config = InspectConfig {
            binary_path: short.path(),
            output_format: OutputFormat::Table,
            arch: None,
            show_sections: true,
            no_color: true,
            pretty: false,
        };
        let err = run_inspect(&config).expect_err("corrupt command should fail");
        assert!(err.to_string().contains("could not be decoded"));
    }
}
