//! Hand-authored example payloads for fallback mode.
//!
//! These let the whole pipeline be exercised without archive or model
//! credentials. They are fixed: the requested month does not change them.

use crate::models::{
    DailyOverview, MonthlyOverview, NormalizedOverview, Relevance, TabType, Topic, WeeklyOverview,
};

fn topic(title: &str, summary: &str, tags: &[&str], url: &str, relevance: Relevance) -> Topic {
    Topic {
        title: title.to_string(),
        summary: summary.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        url: url.to_string(),
        relevance,
    }
}

/// Three days from early January 2024.
pub fn daily() -> Vec<DailyOverview> {
    vec![
        DailyOverview {
            date: "2024-01-03".into(),
            overview: "Markets opened the year cautiously as investors weighed the timing of rate cuts.".into(),
            topics: vec![topic(
                "Fed minutes temper rate-cut hopes",
                "Minutes from the December meeting showed officials in no hurry to lower rates.",
                &["federal reserve", "interest rates", "markets"],
                "https://www.nytimes.com/2024/01/03/business/economy/fed-minutes.html",
                Relevance::High,
            )],
        },
        DailyOverview {
            date: "2024-01-05".into(),
            overview: "A stronger-than-expected jobs report pointed to a resilient labor market.".into(),
            topics: vec![
                topic(
                    "Employers added 216,000 jobs in December",
                    "Hiring beat forecasts while unemployment held at 3.7 percent.",
                    &["jobs report", "labor market"],
                    "https://www.nytimes.com/2024/01/05/business/economy/jobs-report-december.html",
                    Relevance::High,
                ),
                topic(
                    "Wage growth stays firm",
                    "Average hourly earnings rose 4.1 percent from a year earlier.",
                    &["wages", "inflation"],
                    "https://www.nytimes.com/2024/01/05/business/economy/wages.html",
                    Relevance::Medium,
                ),
            ],
        },
        DailyOverview {
            date: "2024-01-09".into(),
            overview: "Consumer technology dominated the news as CES opened in Las Vegas.".into(),
            topics: vec![topic(
                "AI features headline CES",
                "Device makers pitched on-device AI assistants across laptops, TVs and cars.",
                &["technology", "artificial intelligence", "CES"],
                "https://www.nytimes.com/2024/01/09/technology/ces-ai.html",
                Relevance::Medium,
            )],
        },
    ]
}

/// The first two weeks of January 2024.
pub fn weekly() -> Vec<WeeklyOverview> {
    vec![
        WeeklyOverview {
            week: "2024-01-01 to 2024-01-07".into(),
            overview: "The first week of the year centered on the Fed's outlook and a solid jobs report.".into(),
            topics: vec![
                topic(
                    "Rate-cut expectations reset",
                    "Fed minutes and firm hiring pushed back market bets on early cuts.",
                    &["federal reserve", "interest rates"],
                    "https://www.nytimes.com/2024/01/03/business/economy/fed-minutes.html",
                    Relevance::High,
                ),
                topic(
                    "Labor market stays tight",
                    "Payrolls beat forecasts and unemployment stayed near historic lows.",
                    &["jobs report", "labor market"],
                    "https://www.nytimes.com/2024/01/05/business/economy/jobs-report-december.html",
                    Relevance::High,
                ),
            ],
        },
        WeeklyOverview {
            week: "2024-01-08 to 2024-01-14".into(),
            overview: "Inflation data and the start of earnings season set the tone for the second week.".into(),
            topics: vec![
                topic(
                    "Consumer prices tick up",
                    "December CPI rose slightly more than expected, led by housing costs.",
                    &["inflation", "CPI", "housing"],
                    "https://www.nytimes.com/2024/01/11/business/economy/cpi-inflation-december.html",
                    Relevance::High,
                ),
                topic(
                    "Big banks kick off earnings",
                    "Major lenders reported mixed results and set aside more for loan losses.",
                    &["banks", "earnings"],
                    "https://www.nytimes.com/2024/01/12/business/bank-earnings.html",
                    Relevance::Medium,
                ),
            ],
        },
    ]
}

/// January 2024 as a whole.
pub fn monthly() -> MonthlyOverview {
    MonthlyOverview {
        overview: "January 2024 saw markets recalibrate rate-cut expectations against a resilient economy, \
                   while technology companies pushed AI into consumer products and housing stayed constrained by high mortgage rates."
            .into(),
        topics: vec![
            topic(
                "Monetary policy outlook",
                "The Fed signaled patience, pushing expected cuts later into the year.",
                &["federal reserve", "interest rates"],
                "https://www.nytimes.com/2024/01/31/business/economy/fed-meeting-rates.html",
                Relevance::High,
            ),
            topic(
                "Labor market resilience",
                "Hiring and wage growth stayed firm despite higher borrowing costs.",
                &["labor market", "wages"],
                "https://www.nytimes.com/2024/01/05/business/economy/jobs-report-december.html",
                Relevance::High,
            ),
            topic(
                "Housing affordability",
                "Mortgage rates eased from their peak but sales of existing homes stayed near multi-decade lows.",
                &["real estate", "mortgages"],
                "https://www.nytimes.com/2024/01/19/realestate/existing-home-sales.html",
                Relevance::Medium,
            ),
            topic(
                "AI in consumer technology",
                "CES and early-year launches put generative AI at the center of device roadmaps.",
                &["technology", "artificial intelligence"],
                "https://www.nytimes.com/2024/01/09/technology/ces-ai.html",
                Relevance::Low,
            ),
        ],
    }
}

/// The canned payload for `tab`.
pub fn overview_for(tab: TabType) -> NormalizedOverview {
    match tab {
        TabType::Daily => NormalizedOverview::Daily(daily()),
        TabType::Weekly => NormalizedOverview::Weekly(weekly()),
        TabType::Monthly => NormalizedOverview::Monthly(monthly()),
    }
}
