use tabled::{settings::Style, Table, Tabled};
use crate::resource::{LinkMap, Resource};

#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Attribute")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Resources")]
    ids: String,
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Id")]
    id: u64,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Identity and attributes of a resource, one row each
pub fn attribute_table(resource: &Resource) -> String {
    let mut rows = vec![
        AttributeRow { name: "id".to_string(), value: resource.id.to_string() },
        AttributeRow { name: "class".to_string(), value: resource.class.clone() },
    ];
    rows.extend(resource.attributes.iter().map(|(name, value)| AttributeRow {
        name: name.clone(),
        value: value.clone(),
    }));
    render(rows)
}

/// One row per link label, neighbors as a comma-separated id list
pub fn links_table(links: &LinkMap) -> String {
    let rows = links
        .iter()
        .map(|(label, linked)| LinkRow {
            label: label.clone(),
            ids: linked
                .iter()
                .map(|l| l.id().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    render(rows)
}

/// Ordered listing results
pub fn results_table(ids: &[u64], offset: u64) -> String {
    let rows = ids
        .iter()
        .enumerate()
        .map(|(i, id)| ResultRow { position: offset as usize + i + 1, id: *id })
        .collect();
    render(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Attributes, Linked, Meta};

    #[test]
    fn test_attribute_table_lists_identity_first() {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), "John Doe".into());
        let resource = Resource::from_parts(Meta { id: 1, class: "person".into() }, attributes);

        let table = attribute_table(&resource);
        let class_pos = table.find("class").unwrap();
        let name_pos = table.find("John Doe").unwrap();
        assert!(class_pos < name_pos);
    }

    #[test]
    fn test_empty_tables() {
        assert!(links_table(&LinkMap::new()).is_empty());
        assert!(results_table(&[], 0).is_empty());

        let mut links = LinkMap::new();
        links.insert("son".into(), vec![Linked::Id(3), Linked::Id(4)]);
        assert!(links_table(&links).contains("3, 4"));
    }
}
