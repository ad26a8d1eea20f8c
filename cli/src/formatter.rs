use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Row, Table};
use tenet::{Component, Engine, Provenance, Resolution};

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn format_resolution(&self, engine: &Engine, resolution: &Resolution) -> String {
        let title = format!(
            "{}.{} = {}",
            engine.system().describe(resolution.component),
            resolution.field,
            resolution.value
        );

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.add_row(Row::from(vec![Cell::new(&title)]));

        let mut content = String::new();
        content.push_str(&format!("├─ formula  {}\n", resolution.formula));
        content.push_str(&format!("├─ solved   {}\n", resolution.equation));
        content.push_str(&format!(
            "└─ bound    {}\n",
            self.describe_binding(engine, resolution)
        ));
        table.add_row(Row::from(vec![Cell::new(content.trim_end())]));

        format!("{}\n", table)
    }

    pub fn format_solution(&self, engine: &Engine, resolutions: &[Resolution]) -> String {
        if resolutions.is_empty() {
            return "No field could be filled\n".to_string();
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("Component").set_alignment(CellAlignment::Left),
            Cell::new("Field").set_alignment(CellAlignment::Left),
            Cell::new("Value").set_alignment(CellAlignment::Right),
            Cell::new("Equation").set_alignment(CellAlignment::Left),
        ]));

        for resolution in resolutions {
            table.add_row(Row::from(vec![
                Cell::new(engine.system().describe(resolution.component)),
                Cell::new(&resolution.field),
                Cell::new(resolution.value.to_string()).set_alignment(CellAlignment::Right),
                Cell::new(&resolution.equation),
            ]));
        }

        format!("{}\n{} field(s) filled\n", table, resolutions.len())
    }

    pub fn format_system(&self, engine: &Engine) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} class(es), {} formula(s), {} component(s)\n\n",
            engine.system().classes().len(),
            engine.knowledge().len(),
            engine.system().components().count()
        ));

        for id in engine.system().flattened() {
            if let Ok(component) = engine.component(id) {
                output.push_str(&self.format_component(engine, component));
                output.push('\n');
            }
        }
        output
    }

    fn format_component(&self, engine: &Engine, component: &Component) -> String {
        let class = engine.system().classes().get(component.class()).name();
        let mut title = format!("{} ({})", component.name(), class);
        if let Some((owner, group)) = component.container() {
            title.push_str(&format!(" in {}.{}", engine.system().describe(owner), group));
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new(&title).set_alignment(CellAlignment::Left),
            Cell::new("Value").set_alignment(CellAlignment::Right),
            Cell::new("Source").set_alignment(CellAlignment::Left),
        ]));

        for (name, field) in component.fields() {
            let value = field
                .value()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());
            let source = match field.provenance() {
                Some(Provenance::Formula(formula)) => formula.name().to_string(),
                Some(Provenance::Opaque(source)) => source.clone(),
                None if field.is_known() => "given".to_string(),
                None => String::new(),
            };
            table.add_row(Row::from(vec![
                Cell::new(name),
                Cell::new(value).set_alignment(CellAlignment::Right),
                Cell::new(source),
            ]));
        }

        for (name, group) in component.groups() {
            let bounds = match group.max() {
                Some(max) => format!("{}..={}", group.min(), max),
                None => format!("{}..", group.min()),
            };
            let members: Vec<String> = group
                .members()
                .iter()
                .map(|member| engine.system().describe(*member))
                .collect();
            table.add_row(Row::from(vec![
                Cell::new(format!("[{}]", name)),
                Cell::new(members.join(", ")).set_alignment(CellAlignment::Right),
                Cell::new(bounds),
            ]));
        }

        format!("{}\n", table)
    }

    fn describe_binding(&self, engine: &Engine, resolution: &Resolution) -> String {
        let pairs: Vec<String> = resolution
            .binding
            .iter()
            .map(|(alias, component)| format!("{}={}", alias, engine.system().describe(component)))
            .collect();
        pairs.join(", ")
    }
}
