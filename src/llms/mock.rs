//! Deterministic keyword-driven responses.
//!
//! Used when every provider candidate fails (and mock fallback is enabled)
//! or when a caller forces mock mode for demos. Rules are checked in order;
//! the first match wins.

use serde_json::json;

use crate::types::response::{
    ActionItem, Document, Notification, StructuredResponse, Visualization,
};

/// Report templates offered to specific roles, matched by substring against
/// the normalized role key.
const REPORT_TEMPLATES: &[(&str, &str)] = &[
    ("tpo", "Placement Report"),
    ("librarian", "Library Annual Report"),
    ("anti_ragging", "Anti-Ragging Report"),
    ("sc_st_cell", "SC/ST/OBC Cell Report"),
    ("icc", "Internal Complaints Committee (ICC) Report"),
    ("grievance", "Grievance Redressal Report"),
    ("women_cell", "Women Empowerment Cell Report"),
    ("coe", "Examination Results Analysis Report"),
    ("finance", "Financial Audit Report"),
    ("iqac", "Annual Report"),
];

fn download(label: &str, file: &str) -> ActionItem {
    ActionItem::new(label, "download")
        .with_variant("secondary")
        .with_icon("Download")
        .with_payload(json!({ "path": format!("/api/v1/documents/download?file={file}") }))
}

fn link(label: &str, url: &str) -> ActionItem {
    ActionItem::new(label, "link").with_payload(json!({ "url": url }))
}

fn modal(label: &str, modal_id: &str) -> ActionItem {
    ActionItem::new(label, "modal").with_payload(json!({ "modal_id": modal_id }))
}

fn chart(kind: &str, title: &str, labels: &[&str], values: &[f64]) -> Visualization {
    Visualization::new(kind, title, json!({ "labels": labels, "values": values }))
}

/// Template name for `role` if it has one.
pub fn report_template_for(role: &str) -> Option<&'static str> {
    let role_key = role.to_lowercase().replace(' ', "_");
    REPORT_TEMPLATES
        .iter()
        .find(|(key, _)| role_key.contains(key))
        .map(|(_, template)| *template)
}

/// Build the mock reply for `query` asked under `role`.
pub fn mock_response(role: &str, query: &str) -> StructuredResponse {
    let q = query.to_lowercase();
    let has = |word: &str| q.contains(word);

    let mut response = if let Some(template) =
        report_template_for(role).filter(|_| has("report") || has("generate") || has("create"))
    {
        report_draft(template, query)
    } else if has("assign") && has("hod") {
        StructuredResponse {
            content: "**Initiate Task Assignment Workflow**.\n\nTo assign this task to the Head of Department, complete the formal assignment workflow below.".to_string(),
            action_items: vec![
                modal("Open Assignment Form", "assign_hod").with_icon("UserPlus"),
                download("Download Brief", "Task_Assignment_Brief.pdf"),
            ],
            ..StructuredResponse::default()
        }
    } else if has("share") && (has("requirements") || has("finance")) {
        StructuredResponse {
            content: "**Requirements Shared**.\n\nThe requirements document has been compiled and shared with the Finance Department for budget approval.".to_string(),
            notifications: vec![Notification::new(
                "Document Shared",
                "Finance Dept received 'Req_Doc_v2.pdf'.",
                "info",
            )],
            action_items: vec![
                link("Track Approval Status", "/finance/approvals").with_icon("Activity"),
                download("View Document", "Requirements_Specification.pdf").with_icon("FileText"),
            ],
            visualizations: vec![chart(
                "pie",
                "Projected Budget Allocation",
                &["Salaries", "Equipment", "Research", "Contingency"],
                &[45.0, 30.0, 15.0, 10.0],
            )],
            ..StructuredResponse::default()
        }
    } else if has("income") || has("projections") {
        StructuredResponse {
            content: "**Income Projections Generated**.\n\nThe latest projections from the Finance Department indicate a 12% increase in research grant revenue.".to_string(),
            notifications: vec![Notification::new(
                "Data Retrieved",
                "Finance API returned 'Income_FY25.json'.",
                "success",
            )],
            action_items: vec![
                ActionItem::new("Analyze Trends", "button").with_icon("TrendingUp"),
                download("Download Full Report", "Income_Projections_FY25.pdf"),
            ],
            visualizations: vec![chart(
                "bar",
                "Revenue Growth (Projected)",
                &["Q1", "Q2", "Q3", "Q4"],
                &[120.0, 135.0, 142.0, 160.0],
            )],
            ..StructuredResponse::default()
        }
    } else if has("budget") || has("approve") || has("proposal") {
        StructuredResponse {
            content: "**Budget Approval Request Created**.\n\nThe proposal has been formatted and is ready for submission to the Governing Body.".to_string(),
            action_items: vec![
                modal("Submit to Principal", "submit_proposal").with_icon("Send"),
                link("Edit Proposal", "/finance/budget/edit")
                    .with_variant("secondary")
                    .with_icon("Edit"),
            ],
            requires_approval: true,
            approval_from: Some("principal".to_string()),
            ..StructuredResponse::default()
        }
    } else if has("analyze") || has("report") || has("status") || has("system") {
        StructuredResponse {
            content: "**System Status Analysis**.\n\nAcademic and Exam modules are performing optimally. The **Finance module requires attention** due to pending budget approvals.".to_string(),
            notifications: vec![Notification::new(
                "Report Generated",
                "System Status Report ready for review.",
                "success",
            )],
            action_items: vec![
                link(
                    "Edit in Report Builder",
                    "/reports/builder?template=Institution%20Overview&context=System%20Status%20Analysis",
                )
                .with_icon("Edit"),
                modal("Assign Task to Finance", "assign_finance")
                    .with_variant("secondary")
                    .with_icon("UserPlus"),
                download("Download PDF", "System_Status_Report.pdf"),
            ],
            visualizations: vec![
                chart(
                    "bar",
                    "Module Health Index",
                    &["Academic", "Exam", "Finance", "HR", "Research"],
                    &[98.0, 100.0, 75.0, 95.0, 87.0],
                ),
                Visualization::new(
                    "mermaid",
                    "Critical Path Analysis",
                    json!({ "code": "graph TD\n  A[Budget Proposal] --> B{Finance Review}\n  B -->|Pending| C[Principal Approval]\n  C --> D[Disbursement]" }),
                ),
            ],
            documents_generated: vec![Document::pdf("System_Status_Report.pdf")],
            ..StructuredResponse::default()
        }
    } else if has("workload") || has("faculty") {
        StructuredResponse {
            content: "**Faculty Workload Analysis**.\n\nThe HOD is at 85% utilization with 3 active research grants and 12 teaching hours per week. There is bandwidth for administrative tasks.".to_string(),
            action_items: vec![
                ActionItem::new("Proceed with Assignment", "button").with_icon("CheckCircle"),
                link("View Calendar", "/calendar")
                    .with_variant("secondary")
                    .with_icon("Calendar"),
            ],
            visualizations: vec![chart(
                "pie",
                "Workload Distribution",
                &["Teaching", "Research", "Admin", "Free"],
                &[40.0, 30.0, 15.0, 15.0],
            )],
            ..StructuredResponse::default()
        }
    } else if has("approval") || (has("status") && has("finance")) {
        StructuredResponse {
            content: "**Approval Status: Pending**.\n\nThe Requirements Document is **Under Review** by the Finance Officer. Expected completion: 24 hours.".to_string(),
            action_items: vec![
                ActionItem::new("Send Reminder", "button").with_icon("Bell"),
                modal("Escalate to Principal", "escalate")
                    .with_variant("danger")
                    .with_icon("AlertTriangle"),
            ],
            visualizations: vec![Visualization::new(
                "mermaid",
                "Approval Workflow Status",
                json!({ "code": "graph LR\n  A[Submitted] --> B[Finance Review]\n  B -.-> C[Approved]" }),
            )],
            ..StructuredResponse::default()
        }
    } else if has("resend") || has("reminder") {
        StructuredResponse {
            content: "**Notification Sent**.\n\nA high-priority reminder has been sent to the relevant department head regarding 'Requirements Specification v2'.".to_string(),
            notifications: vec![Notification::new(
                "Reminder Sent",
                "Email sent to the finance office.",
                "success",
            )],
            action_items: vec![link("Return to Dashboard", "/")
                .with_variant("secondary")
                .with_icon("Home")],
            ..StructuredResponse::default()
        }
    } else if has("trends") || has("growth") {
        StructuredResponse {
            content: "**Income Trend Analysis (5-Year)**.\n\nRevenue has grown at a CAGR of 8.5%. The sharpest increase is in Consultancy Services.".to_string(),
            visualizations: vec![chart(
                "line",
                "5-Year Revenue Trend",
                &["2020", "2021", "2022", "2023", "2024"],
                &[10.2, 11.5, 12.8, 14.1, 15.6],
            )],
            action_items: vec![
                download("Export to Excel", "Growth.xlsx")
                    .with_variant("primary")
                    .with_icon("FileSpreadsheet"),
                modal("Share with Board", "share_board")
                    .with_variant("secondary")
                    .with_icon("Share2"),
            ],
            ..StructuredResponse::default()
        }
    } else {
        StructuredResponse {
            content: format!(
                "**Mock Mode Active**: Generating simulated response for '{query}'.\n\n**Action Required**: Please review the simulation results below."
            ),
            action_items: vec![
                modal("Assign Task to HOD", "assign_hod").with_icon("UserPlus"),
                ActionItem::new("Share Requirements", "workflow_start")
                    .with_variant("secondary")
                    .with_icon("Share2")
                    .with_payload(json!({ "workflow_id": "share_reqs" })),
                download("Download Report", "System_Status_Report.pdf"),
            ],
            visualizations: vec![chart(
                "bar",
                "Simulated Resource Check",
                &["Available", "Required", "Pending"],
                &[80.0, 100.0, 20.0],
            )],
            ..StructuredResponse::default()
        }
    };

    response.agent_name = role.to_string();
    response.metadata.insert("mock".to_string(), json!(true));
    response
        .metadata
        .insert("token_usage".to_string(), json!({ "total_tokens": 0 }));
    response
}

fn report_draft(template: &str, query: &str) -> StructuredResponse {
    let file = format!("Draft_{}.pdf", template.replace(' ', "_"));
    let builder_url = format!(
        "/reports/builder?template={}&context={}",
        template.replace(' ', "%20"),
        query.replace(' ', "%20")
    );
    StructuredResponse {
        content: format!(
            "**{template} Generation**.\n\nI have prepared the draft for the **{template}** based on your request. You can review and customize it in the Report Builder."
        ),
        notifications: vec![Notification::new(
            "Draft Created",
            format!("{template} ready for editing."),
            "success",
        )],
        documents_generated: vec![Document::pdf(file.clone())],
        action_items: vec![
            link("Edit in Report Builder", &builder_url).with_icon("Edit"),
            download("Download PDF", &file),
        ],
        ..StructuredResponse::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_template_requires_report_keyword() {
        let resp = mock_response("TPO", "Generate the placement summary");
        assert!(resp.content.contains("Placement Report"));
        assert_eq!(resp.documents_generated[0].filename, "Draft_Placement_Report.pdf");
        assert_eq!(resp.agent_name, "TPO");

        // No report keyword: falls through to the keyword table.
        let resp = mock_response("TPO", "hello there");
        assert!(resp.content.starts_with("**Mock Mode Active**"));
    }

    #[test]
    fn test_role_key_is_normalized() {
        assert_eq!(report_template_for("Women Cell"), Some("Women Empowerment Cell Report"));
        assert_eq!(report_template_for("finance_officer"), Some("Financial Audit Report"));
        assert_eq!(report_template_for("faculty"), None);
    }

    #[test]
    fn test_rule_order() {
        assert!(mock_response("principal", "Assign this to the HOD")
            .content
            .contains("Task Assignment"));
        assert!(mock_response("principal", "share requirements with finance")
            .content
            .contains("Requirements Shared"));
        assert!(mock_response("principal", "income projections for FY25")
            .content
            .contains("Income Projections"));
        assert!(mock_response("principal", "Approve the lab budget")
            .content
            .contains("Budget Approval"));
        assert!(mock_response("principal", "system status")
            .content
            .contains("System Status"));
        assert!(mock_response("principal", "faculty workload")
            .content
            .contains("Workload"));
        assert!(mock_response("principal", "where is my approval")
            .content
            .contains("Approval Status"));
        assert!(mock_response("principal", "resend the mail")
            .content
            .contains("Notification Sent"));
        assert!(mock_response("principal", "revenue trends")
            .content
            .contains("Trend Analysis"));
    }

    #[test]
    fn test_default_echoes_query() {
        let resp = mock_response("faculty", "What is the canteen menu?");
        assert!(resp
            .content
            .contains("Generating simulated response for 'What is the canteen menu?'"));
        assert_eq!(resp.metadata["mock"], json!(true));
        assert!(resp.success);
    }
}
