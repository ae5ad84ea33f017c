use crate::types::{
    CommandDetail, CommandReport, FatReport, HeaderReport, ImageReport, Report, SegmentReport,
};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Color, Table, presets::UTF8_FULL_CONDENSED};

pub struct TableFormatter {
    no_color: bool,
}

impl TableFormatter {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// Header, fat table, load commands and segments of every image.
    pub fn format_inspect(&self, path: &str, report: &Report, show_sections: bool) -> String {
        let mut output = self.heading(&format!("Analyzing Mach-O file: {}", path));
        output.push('\n');

        if let Some(ref fat) = report.fat {
            output.push('\n');
            output.push_str(&self.format_fat(fat));
        }

        for image in &report.images {
            output.push('\n');
            output.push_str(&self.image_title(image));
            output.push('\n');

            if let Some(ref header) = image.header {
                output.push_str(&format_header(header));
                output.push_str("\n\n");
            }

            if !image.load_commands.is_empty() {
                output.push_str(&self.heading("Load Commands"));
                output.push('\n');
                output.push_str(&format_commands(&image.load_commands));
                output.push_str("\n\n");
            }

            for segment in &image.segments {
                output.push_str(&self.format_segment(segment, show_sections));
                output.push('\n');
            }

            output.push_str(&self.format_diagnostics(image));
        }

        output
    }

    /// Symbol table (and optionally string table) of every image.
    pub fn format_symbols(&self, path: &str, report: &Report, show_strings: bool) -> String {
        let mut output = self.heading(&format!("Dumping symbols from: {}", path));
        output.push('\n');

        for image in &report.images {
            output.push('\n');
            output.push_str(&self.image_title(image));
            output.push('\n');

            match image.symtab {
                None if image.header.is_some() => output.push_str("No symbol table found\n"),
                None => {}
                Some(ref symtab) => {
                    output.push_str(&format!(
                        "Symbol table offset: {}\nNumber of symbols: {}\n\
                         String table offset: {}\nString table size: {} bytes\n\n",
                        symtab.symoff, symtab.nsyms, symtab.stroff, symtab.strsize
                    ));

                    let mut table = Table::new();
                    table.load_preset(UTF8_FULL_CONDENSED);
                    table.set_header(vec!["Idx", "Name", "Type", "Sect", "Value", "Description"]);
                    for sym in &image.symbols {
                        table.add_row(vec![
                            Cell::new(sym.index).set_alignment(CellAlignment::Right),
                            Cell::new(&sym.name),
                            Cell::new(sym.type_char),
                            Cell::new(sym.sect).set_alignment(CellAlignment::Right),
                            Cell::new(format!("0x{:016x}", sym.value)),
                            Cell::new(sym.weak.unwrap_or(if sym.stab { "debug" } else { "" })),
                        ]);
                    }
                    output.push_str(&table.to_string());
                    output.push('\n');

                    if show_strings {
                        output.push('\n');
                        output.push_str(&self.heading("String Table Contents"));
                        output.push('\n');
                        let mut table = Table::new();
                        table.load_preset(UTF8_FULL_CONDENSED);
                        table.set_header(vec!["Offset", "String"]);
                        for entry in &image.strings {
                            table.add_row(vec![
                                Cell::new(entry.offset).set_alignment(CellAlignment::Right),
                                Cell::new(&entry.value),
                            ]);
                        }
                        output.push_str(&table.to_string());
                        output.push('\n');
                    }
                }
            }

            output.push_str(&self.format_diagnostics(image));
        }

        output
    }

    fn format_fat(&self, fat: &FatReport) -> String {
        let mut output = self.heading("Fat Binary Header");
        output.push_str(&format!(
            "\nMagic: {:#x}\nNumber of architectures: {}\n",
            fat.magic, fat.nfat_arch
        ));

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["#", "CPU Type", "CPU Subtype", "Offset", "Size", "Alignment"]);
        for arch in &fat.architectures {
            table.add_row(vec![
                Cell::new(arch.index + 1),
                Cell::new(format!("{} ({})", arch.cputype, arch.cpu_name)),
                Cell::new(arch.cpusubtype),
                Cell::new(arch.offset),
                Cell::new(format!("{} bytes", arch.size)),
                Cell::new(format!("2^{}", arch.align)),
            ]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_segment(&self, segment: &SegmentReport, show_sections: bool) -> String {
        let title = format!(
            "Segment {}  vm 0x{:x}-0x{:x}  file {}-{}  {}",
            segment.name,
            segment.vmaddr,
            segment.vmaddr.wrapping_add(segment.vmsize),
            segment.fileoff,
            segment.fileoff.wrapping_add(segment.filesize),
            segment.protection
        );
        let mut output = self.heading(&title);
        output.push('\n');

        if !show_sections {
            output.push_str(&format!("  {} section(s)\n", segment.nsects));
            return output;
        }
        if segment.sections.is_empty() {
            output.push_str("  (no sections)\n");
            return output;
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["Section", "Address", "Size", "Offset", "Align", "Type", "Attributes"]);
        for s in &segment.sections {
            table.add_row(vec![
                Cell::new(format!("{}.{}", s.segname, s.sectname)),
                Cell::new(format!("0x{:x}", s.addr)),
                Cell::new(s.size),
                Cell::new(s.offset),
                Cell::new(format!("2^{}", s.align)),
                Cell::new(format!("{:#x}", s.section_type)),
                Cell::new(format!("{:#x}", s.attributes)),
            ]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_diagnostics(&self, image: &ImageReport) -> String {
        if image.diagnostics.is_empty() {
            return String::new();
        }

        let mut output = String::new();
        let header = "\nDecoding errors:";
        if self.no_color {
            output.push_str(header);
        } else {
            output.push_str(&header.red().bold().to_string());
        }
        output.push('\n');

        for d in &image.diagnostics {
            let msg = format!("  - {}: {}", d.structure, d.message);
            if self.no_color {
                output.push_str(&msg);
            } else {
                output.push_str(&msg.yellow().to_string());
            }
            output.push('\n');
        }
        output
    }

    fn image_title(&self, image: &ImageReport) -> String {
        let title = match (image.arch_index, image.cpu_name()) {
            (Some(i), Some(cpu)) => {
                format!("Architecture #{} ({}) at offset {}", i + 1, cpu, image.offset)
            }
            (Some(i), None) => format!("Architecture #{} at offset {}", i + 1, image.offset),
            (None, _) => "Mach-O Image".to_string(),
        };
        self.heading(&format!("=== {} ===", title))
    }

    fn heading(&self, text: &str) -> String {
        if self.no_color { text.to_string() } else { text.bold().to_string() }
    }
}

fn format_header(h: &HeaderReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Field", "Value"]);
    let rows = [
        ("Magic", format!("{:#x} ({})", h.magic, h.description)),
        ("CPU Type", format!("{} ({})", h.cputype, h.cpu_name)),
        ("CPU Subtype", h.cpusubtype.to_string()),
        ("File Type", format!("{} ({})", h.filetype, h.filetype_name)),
        ("Number of load commands", h.ncmds.to_string()),
        ("Size of load commands", format!("{} bytes", h.sizeofcmds)),
        ("Flags", format!("{:#x}", h.flags)),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    table.to_string()
}

fn format_commands(commands: &[CommandReport]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["#", "Offset", "Command", "Size", "Details"]);
    for c in commands {
        let name = if c.name == "other" {
            Cell::new(format!("other: {:#x}", c.cmd)).fg(Color::DarkGrey)
        } else {
            Cell::new(c.name)
        };
        table.add_row(vec![
            Cell::new(c.index + 1),
            Cell::new(c.offset),
            name,
            Cell::new(format!("{} bytes", c.cmdsize)),
            Cell::new(describe(&c.detail)),
        ]);
    }
    table.to_string()
}

fn describe(detail: &CommandDetail) -> String {
    match detail {
        CommandDetail::Segment { segname, vmaddr, vmsize, fileoff, filesize, nsects } => format!(
            "{} vm 0x{:x} ({} bytes), file {} ({} bytes), {} section(s)",
            segname, vmaddr, vmsize, fileoff, filesize, nsects
        ),
        CommandDetail::Symtab { symoff, nsyms, stroff, strsize } => format!(
            "{} symbols at {}, {} string bytes at {}",
            nsyms, symoff, strsize, stroff
        ),
        CommandDetail::Uuid { uuid } => uuid.clone(),
        CommandDetail::EntryPoint { entryoff, stacksize } => {
            format!("entry offset 0x{:x}, stack size {}", entryoff, stacksize)
        }
        CommandDetail::Dylib { name, current_version, compatibility_version } => format!(
            "{} (current {}, compatibility {})",
            name, current_version, compatibility_version
        ),
        CommandDetail::Dylinker { name } => name.clone(),
        CommandDetail::Opaque => String::new(),
    }
}
