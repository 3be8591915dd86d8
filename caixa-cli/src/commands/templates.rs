//! Templates command - list supported banks

use anyhow::Result;
use colored::Colorize;

use crate::output;
use caixa_core::templates::all_templates;
use caixa_core::OperationResult;

pub fn run(json: bool) -> Result<()> {
    let templates = all_templates();

    if json {
        return output::print_json(&OperationResult::ok(templates));
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Banco", "Separador", "Codificação", "Linhas ignoradas"]);
    for template in templates {
        let delimiter = match template.delimiter {
            '\t' => "TAB".to_string(),
            c => c.to_string(),
        };
        table.add_row(vec![
            template.id.to_string(),
            template.name.to_string(),
            delimiter,
            template.encoding.label().to_string(),
            template.skip_lines.to_string(),
        ]);
    }
    println!("{table}");
    println!();
    println!(
        "{}",
        "Use --template <ID> with `caixa import`; 'generico' detects the layout.".dimmed()
    );
    Ok(())
}
