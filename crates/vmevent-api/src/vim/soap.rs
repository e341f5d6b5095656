// SOAP 1.1 envelope construction and response unwrapping.

use quick_xml::escape::escape;

use crate::error::Error;
use crate::vim::models::ManagedObjectReference;
use crate::xml::XmlNode;

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/""#,
    r#" xmlns:xsd="http://www.w3.org/2001/XMLSchema""#,
    r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    "<soapenv:Body>",
);
const ENVELOPE_CLOSE: &str = "</soapenv:Body></soapenv:Envelope>";

/// Builds the body element of one vim25 method call.
///
/// Arguments must be appended in WSDL sequence order; the endpoint rejects
/// out-of-order elements.
pub(crate) struct Request {
    op: &'static str,
    body: String,
}

impl Request {
    pub(crate) fn new(op: &'static str, this: &ManagedObjectReference) -> Self {
        let mut req = Self {
            op,
            body: String::new(),
        };
        req.body.push_str(&moref("_this", this));
        req
    }

    pub(crate) fn op(&self) -> &'static str {
        self.op
    }

    pub(crate) fn text(mut self, name: &str, value: &str) -> Self {
        self.body.push_str(&text(name, value));
        self
    }

    /// Append pre-rendered XML (nested data objects).
    pub(crate) fn raw(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    pub(crate) fn into_envelope(self) -> String {
        format!(
            r#"{ENVELOPE_OPEN}<{op} xmlns="urn:vim25">{body}</{op}>{ENVELOPE_CLOSE}"#,
            op = self.op,
            body = self.body,
        )
    }
}

pub(crate) fn text(name: &str, value: &str) -> String {
    format!("<{name}>{}</{name}>", escape(value))
}

pub(crate) fn moref(name: &str, value: &ManagedObjectReference) -> String {
    format!(
        r#"<{name} type="{}">{}</{name}>"#,
        escape(value.kind.as_str()),
        escape(value.value.as_str())
    )
}

/// Extract `<{op}Response>` from a response document, or the fault it carries.
pub(crate) fn unwrap_response(doc: &XmlNode, op: &str) -> Result<XmlNode, Error> {
    let body = doc
        .child("Body")
        .ok_or_else(|| Error::missing("SOAP Body", &doc.name))?;

    if let Some(fault) = body.child("Fault") {
        return Err(fault_error(fault));
    }

    let expected = format!("{op}Response");
    body.child(&expected)
        .cloned()
        .ok_or_else(|| Error::missing(&expected, &doc.name))
}

/// Find and convert a SOAP fault anywhere in the document.
pub(crate) fn find_fault(doc: &XmlNode) -> Option<Error> {
    doc.child("Body")
        .and_then(|b| b.child("Fault"))
        .map(fault_error)
}

fn fault_error(fault: &XmlNode) -> Error {
    let code = fault.child_text("faultcode").unwrap_or_default().to_owned();
    let message = fault.child_text("faultstring").unwrap_or_default().to_owned();
    let kind = fault
        .child("detail")
        .and_then(|d| d.children.first())
        .map(|d| {
            d.xsi_type()
                .map_or_else(|| d.name.trim_end_matches("Fault").to_owned(), str::to_owned)
        });

    match kind.as_deref() {
        Some("InvalidLogin") => Error::Authentication { message },
        Some("NotAuthenticated") => Error::SessionExpired,
        _ => Error::Fault {
            code,
            message,
            kind,
        },
    }
}
