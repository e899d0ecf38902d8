use serde_json::{Map, Value};

pub const TABLE_ROWS: usize = 1000;

/// Ten-column HTML table over `table`.
pub const TABLE_TEMPLATE: &str = r#"
<table>
    {% for row in table %}
        <tr>
            {% for key, column in row|items %}
                <td>{{ column }}</td>
            {% endfor %}
        </tr>
    {% endfor %}
</table>
"#;

/// Search context for [`TABLE_TEMPLATE`]: `TABLE_ROWS` rows of `a..j = 1..10`.
pub fn table_context() -> Value {
    let row: Map<String, Value> = ('a'..='j')
        .zip(1..=10_i64)
        .map(|(key, value)| (key.to_string(), Value::from(value)))
        .collect();
    let table = vec![Value::Object(row); TABLE_ROWS];

    let mut context = Map::new();
    context.insert("table".to_string(), Value::Array(table));
    Value::Object(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_shape() {
        let ctx = table_context();
        let rows = ctx["table"].as_array().unwrap();
        assert_eq!(rows.len(), TABLE_ROWS);
        assert_eq!(rows[0]["a"], 1);
        assert_eq!(rows[999]["j"], 10);
        assert_eq!(rows[0].as_object().unwrap().len(), 10);
    }
}
