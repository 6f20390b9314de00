use crate::infra::Workflows;
use clap::Args;
use pothole_tracker::error::AppError;
use pothole_tracker::workflows::intake::{
    IntakePolicy, IntakeReceipt, LocationType, ReportSubmission, ReporterIdentity, UserId,
};
use pothole_tracker::workflows::repairs::{ProgressUpdate, WorkOrderRequest, WorkOrderStatus};

/// Roughly 25 and 50 meters of latitude.
const DEGREES_25_M: f64 = 0.000_224_8;
const DEGREES_50_M: f64 = 0.000_449_6;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print full receipts as JSON instead of one-line summaries.
    #[arg(long)]
    pub(crate) json: bool,
    /// Skip the repair portion of the demo.
    #[arg(long)]
    pub(crate) skip_repairs: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { json, skip_repairs } = args;
    let workflows = Workflows::with_policy(IntakePolicy::default());
    let intake = &workflows.intake;

    println!("Pothole reporting demo");
    let policy = intake.policy();
    println!(
        "Reward {:.2} | duplicates within {:.0} m of the {} newest potholes | photos: {} up to {} bytes",
        policy.reward_amount,
        policy.resolver.threshold_meters,
        policy.resolver.candidate_window,
        policy.photos.allowed_extensions().join(", "),
        policy.photos.max_bytes()
    );

    println!("\nScenario A: first report of a new pothole");
    let first = intake.submit(report(1, "Rahim", "12, Main Street!!", None))?;
    render_receipt(&first, json);

    println!("\nScenario B: same address, different formatting");
    let repeat = intake.submit(report(2, "Karim", "12 main street", None))?;
    render_receipt(&repeat, json);

    println!("\nScenario C: nearby reports with a new address");
    let origin = (23.8103, 90.4125);
    let anchor = intake.submit(report(3, "Nadia", "Opposite the mosque", Some(origin)))?;
    render_receipt(&anchor, json);
    let near = intake.submit(report(
        4,
        "Tariq",
        "Road 5, House 2",
        Some((origin.0 + DEGREES_25_M, origin.1)),
    ))?;
    render_receipt(&near, json);
    let far = intake.submit(report(
        4,
        "Tariq",
        "Road 5, House 9",
        Some((origin.0 + DEGREES_50_M, origin.1)),
    ))?;
    render_receipt(&far, json);

    println!("\nWallets");
    for user in 1..=4 {
        let wallet = intake.wallet(UserId(user))?;
        println!(
            "- user {}: balance {:.2} ({} transactions)",
            user,
            wallet.balance,
            wallet.transactions.len()
        );
    }

    if !skip_repairs {
        println!("\nRepair of {}", first.tracking_code);
        let order = workflows.repairs.open_work_order(
            first.tracking_code.as_str(),
            WorkOrderRequest {
                crew: "North crew".to_string(),
                notes: None,
            },
        )?;
        println!("- work order {} opened for {}", order.id, order.crew);
        let done = workflows.repairs.record_progress(
            order.id,
            ProgressUpdate {
                hours_applied: 3.0,
                people_used: 2,
                filler_material_kg: 40.0,
                material_cost: 120.0,
                equipment_cost: 45.0,
                status: WorkOrderStatus::Completed,
                notes: None,
            },
        )?;
        println!(
            "- completed: labor {:.2}, total {:.2}",
            done.labor_cost, done.total_cost
        );
    }

    let summary = intake.summary()?;
    println!(
        "\nPotholes: {} total | {} reported | {} in progress | {} repaired",
        summary.total, summary.reported, summary.in_progress, summary.repaired
    );
    Ok(())
}

fn report(
    user: u64,
    name: &str,
    address: &str,
    position: Option<(f64, f64)>,
) -> ReportSubmission {
    ReportSubmission {
        street_address: address.to_string(),
        severity: 8,
        location: LocationType::Middle,
        latitude: position.map(|(latitude, _)| latitude),
        longitude: position.map(|(_, longitude)| longitude),
        reporter: ReporterIdentity {
            user_id: UserId(user),
            name: name.to_string(),
            email: None,
            phone: None,
        },
        photos: Vec::new(),
    }
}

fn render_receipt(receipt: &IntakeReceipt, json: bool) {
    if json {
        match serde_json::to_string_pretty(receipt) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("  receipt unavailable: {err}"),
        }
        return;
    }

    println!("- {}", receipt.message());
    println!(
        "  duplicate: {} | priority: {} | reward: {}",
        receipt.duplicate,
        receipt.priority.label(),
        receipt
            .reward_granted
            .map(|amount| format!("{amount:.2}"))
            .unwrap_or_else(|| "none".to_string())
    );
}
