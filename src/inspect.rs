use crate::error::{Error, Result};
use crate::macho::consts::FAT_HEADER_SIZE;
use crate::macho::{
    Kind, LoadCommand, StringTable, SymtabCommand, classify, load_commands, parse_container,
    parse_image_header, read_architecture, read_sections, read_string_table, read_symbol_table,
};
use crate::types::{
    ArchReport, CommandReport, Diagnostic, FatReport, HeaderReport, ImageReport, Report,
    SegmentReport, StringEntry, SymbolReport, SymtabReport,
};
use object::endian::{BigEndian, Endian};

/// Decodes everything reachable in `data`.
///
/// Only failures that leave nothing to report (an unrecognized file or a
/// broken fat header) are returned as errors. An unreadable architecture entry,
/// a slice outside the file, or a failure inside an image is recorded as a
/// diagnostic on that image, and decoding continues with whatever is still
/// independently reachable.
pub fn inspect_buffer(data: &[u8]) -> Result<Report> {
    match classify(data)? {
        Kind::Invalid => {
            let magic = BigEndian.read_u32_bytes([data[0], data[1], data[2], data[3]]);
            Err(Error::Format(format!("unrecognized magic {:#010x}", magic)))
        }
        Kind::Thin => {
            Ok(Report { kind: Kind::Thin, fat: None, images: vec![inspect_image(data, None, 0)] })
        }
        Kind::Fat => {
            let fat = parse_container(data)?;
            let mut fat_report = FatReport::from(&fat);
            let mut images = Vec::new();

            for index in 0..fat.nfat_arch {
                let arch_index = Some(index as usize);
                let arch = match read_architecture(&fat, data, index) {
                    Ok(arch) => arch,
                    Err(e) => {
                        // Later entries sit further into the same short table.
                        let entry = (FAT_HEADER_SIZE as u64)
                            .saturating_add(u64::from(index) * fat.entry_size() as u64);
                        let mut image = ImageReport::new(arch_index, entry);
                        record(&mut image, "fat architecture table", &e);
                        images.push(image);
                        break;
                    }
                };
                fat_report.architectures.push(ArchReport::new(index as usize, &arch));

                match arch.slice(data) {
                    Ok(slice) => images.push(inspect_image(slice, arch_index, arch.offset)),
                    Err(e) => {
                        let mut image = ImageReport::new(arch_index, arch.offset);
                        record(&mut image, "fat architecture slice", &e);
                        images.push(image);
                    }
                }
            }

            Ok(Report { kind: Kind::Fat, fat: Some(fat_report), images })
        }
    }
}

/// Decodes one thin image. `data` starts at the image's Mach header; `offset`
/// is only used to report where the image sits in the file.
pub fn inspect_image(data: &[u8], arch_index: Option<usize>, offset: u64) -> ImageReport {
    let mut report = ImageReport::new(arch_index, offset);

    let header = match parse_image_header(data, 0) {
        Ok(h) => h,
        Err(e) => {
            record(&mut report, "mach header", &e);
            return report;
        }
    };
    report.header = Some(HeaderReport::from(&header));

    let mut symtab: Option<SymtabCommand> = None;
    for command in load_commands(&header, data) {
        let command = match command {
            Ok(c) => c,
            Err(e) => {
                record(&mut report, "load commands", &e);
                continue;
            }
        };
        report.load_commands.push(CommandReport::from(&command));

        match command {
            LoadCommand::Segment(segment) => {
                let sections = read_sections(&segment, data).unwrap_or_else(|e| {
                    record(&mut report, &format!("sections of segment {}", segment.name()), &e);
                    Vec::new()
                });
                report.segments.push(SegmentReport::new(&segment, &sections));
            }
            LoadCommand::Symtab(s) if symtab.is_none() => symtab = Some(s),
            _ => {}
        }
    }

    if let Some(symtab) = symtab {
        report.symtab = Some(SymtabReport::from(&symtab));

        let strings = read_string_table(&symtab, &header, data).unwrap_or_else(|e| {
            record(&mut report, "string table", &e);
            StringTable::empty()
        });
        report.strings = strings
            .entries()
            .map(|(offset, value)| StringEntry { offset, value: value.into_owned() })
            .collect();

        match read_symbol_table(&symtab, &header, data) {
            Ok(symbols) => {
                report.symbols = symbols
                    .iter()
                    .map(|s| SymbolReport::new(s, strings.name(s.strx).into_owned()))
                    .collect();
            }
            Err(e) => record(&mut report, "symbol table", &e),
        }
    }

    report
}

fn record(report: &mut ImageReport, structure: &str, err: &Error) {
    tracing::warn!(structure, offset = report.offset, error = %err, "failed to decode");
    report.diagnostics.push(Diagnostic {
        structure: structure.to_string(),
        kind: err.kind(),
        message: err.to_string(),
    });
}
