use crate::models::Company;

/// Subject plus HTML and plain-text bodies of one email.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

const BRAND: &str = "DiversIA";
const SITE_URL: &str = "https://diversia.es";

/// Sent to a job seeker after registration.
pub fn candidate_welcome(name: &str) -> RenderedEmail {
    let name = display_name(name, "candidata/o");
    let subject = format!("Bienvenida a {BRAND}, {name}");

    let text = format!(
        "Hola {name},\n\n\
         Gracias por registrarte en {BRAND}. Hemos recibido tu perfil y nuestro equipo \
         revisará las ofertas de empresas inclusivas que mejor encajen contigo.\n\n\
         Puedes actualizar tus datos en cualquier momento en {SITE_URL}.\n\n\
         El equipo de {BRAND}"
    );

    let body = format!(
        "<p>Hola <strong>{}</strong>,</p>\
         <p>Gracias por registrarte en {BRAND}. Hemos recibido tu perfil y nuestro equipo \
         revisará las ofertas de empresas inclusivas que mejor encajen contigo.</p>\
         <p>Puedes actualizar tus datos en cualquier momento en \
         <a href=\"{SITE_URL}\">{SITE_URL}</a>.</p>",
        escape_html(&name)
    );

    RenderedEmail {
        html: layout(&subject, &body),
        subject,
        text,
    }
}

/// Sent to a company contact after the company is registered.
pub fn company_welcome(company_name: &str) -> RenderedEmail {
    let company_name = display_name(company_name, "Tu empresa");
    let subject = format!("{company_name} ya forma parte de {BRAND}");

    let text = format!(
        "Hola,\n\n\
         {company_name} se ha registrado correctamente como empresa inclusiva en {BRAND}. \
         En breve nos pondremos en contacto para conocer vuestras vacantes y necesidades.\n\n\
         El equipo de {BRAND}"
    );

    let body = format!(
        "<p>Hola,</p>\
         <p><strong>{}</strong> se ha registrado correctamente como empresa inclusiva en {BRAND}. \
         En breve nos pondremos en contacto para conocer vuestras vacantes y necesidades.</p>",
        escape_html(&company_name)
    );

    RenderedEmail {
        html: layout(&subject, &body),
        subject,
        text,
    }
}

/// Internal alert for the admin mailbox.
pub fn new_company_alert(company: &Company) -> RenderedEmail {
    let subject = format!("Nueva empresa registrada: {}", company.name);

    let rows = [
        ("ID", company.id.to_string()),
        ("Empresa", company.name.clone()),
        ("Email", company.email.clone()),
        ("Teléfono", company.phone.clone()),
        ("Sector", company.sector.clone()),
        ("Ciudad", company.city.clone()),
        ("Alta", company.created_at.format("%Y-%m-%d %H:%M UTC").to_string()),
    ];

    let text = rows
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");

    let table_rows: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                "<tr><th align=\"left\">{label}</th><td>{}</td></tr>",
                escape_html(value)
            )
        })
        .collect();
    let body = format!("<p>Se ha registrado una nueva empresa:</p><table>{table_rows}</table>");

    RenderedEmail {
        html: layout(&subject, &body),
        subject,
        text,
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"es\"><head><meta charset=\"utf-8\"><title>{}</title></head>\
         <body style=\"font-family: Arial, sans-serif; color: #222;\">\
         <h2 style=\"color: #5b3cc4;\">{BRAND}</h2>{body}\
         <p style=\"font-size: 12px; color: #777;\">{BRAND} · Empleo para personas neurodivergentes</p>\
         </body></html>",
        escape_html(title)
    )
}

fn display_name(name: &str, fallback: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

/// Escapes the characters that matter inside HTML text and attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
