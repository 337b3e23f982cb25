use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use sqlx::SqlitePool;
use std::io::Write;

use crate::config::Config;
use crate::db::{create_pool, init_database_with_pool, seed_initial_teams};
use crate::error::ErrorKind;
use crate::models::{CreateLeagueRequest, League, Standings};
use crate::services::{LeagueLocks, LeagueService, Predictor, TeamService};
use crate::utils::{calculate_points_percentage, format_percentage, team_form};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

async fn open_pool(config: &Config) -> Result<SqlitePool> {
    let pool = create_pool(&config.database_url).await?;
    init_database_with_pool(&pool).await?;
    Ok(pool)
}

fn league_service(pool: SqlitePool, config: &Config) -> LeagueService {
    LeagueService::new(
        pool,
        LeagueLocks::default(),
        Predictor::new(config.simulation_runs, config.min_prediction_week),
    )
}

pub async fn seed(config: &Config) -> Result<()> {
    let pool = open_pool(config).await?;

    println!("🌱 Seeding default teams...");
    let teams = seed_initial_teams(&pool).await?;
    for team in &teams {
        println!("   • {} (strength {})", team.name, team.strength);
    }
    println!("✅ {} teams available", teams.len());
    Ok(())
}

pub async fn create_league(config: &Config, name: &str) -> Result<()> {
    let pool = open_pool(config).await?;
    seed_initial_teams(&pool).await?;

    let league = league_service(pool, config)
        .create_league(CreateLeagueRequest {
            name: name.to_string(),
        })
        .await?;

    println!("🏆 Created league #{} '{}'", league.id, league.name);
    println!(
        "   {} teams, {} weeks, {} matches",
        league.teams.len(),
        league.total_weeks,
        league.matches.len()
    );
    for week in 1..=league.total_weeks {
        println!("\n📅 Week {}:", week);
        for m in league.matches.iter().filter(|m| m.week == week) {
            println!("   {} vs {}", team_name(&league, m.home_team_id), team_name(&league, m.away_team_id));
        }
    }
    Ok(())
}

pub async fn simulate(config: &Config, league_id: i64, all: bool) -> Result<()> {
    let pool = open_pool(config).await?;
    let leagues = league_service(pool, config);

    if all {
        println!("⚽ Simulating all remaining weeks of league #{}...", league_id);
        let result = leagues.simulate_all_weeks(league_id).await?;
        for weekly in &result.weekly_results {
            println!("\n📅 Week {}:", weekly.week);
            for m in &weekly.matches {
                println!(
                    "   {} {} - {} {} ({})",
                    m.home_team, m.home_score, m.away_score, m.away_team, m.result
                );
            }
        }
        println!(
            "\n✅ Simulated weeks {} to {}",
            result.starting_week + 1,
            result.ending_week
        );
        print_standings(&result.final_standings, None);
    } else {
        let standings = leagues.simulate_week(league_id).await?;
        let league = leagues.get_league(league_id).await?;
        println!("⚽ Week {} results:", standings.week);
        for m in league.matches.iter().filter(|m| m.week == standings.week) {
            println!(
                "   {} {} - {} {}",
                team_name(&league, m.home_team_id),
                m.home_score,
                m.away_score,
                team_name(&league, m.away_team_id)
            );
        }
        print_standings(&standings, Some(&league));
    }
    Ok(())
}

pub async fn show_standings(config: &Config, league_id: i64) -> Result<()> {
    let pool = open_pool(config).await?;
    let league = league_service(pool, config).get_league(league_id).await?;

    println!(
        "📊 {} after week {}/{}",
        league.name, league.current_week, league.total_weeks
    );
    print_standings(&league.standings, Some(&league));
    Ok(())
}

pub async fn predict(config: &Config, league_id: i64) -> Result<()> {
    let pool = open_pool(config).await?;
    let leagues = league_service(pool, config);

    println!("🔮 Predicting final standings for league #{}...", league_id);

    match leagues.prediction_with_confidence(league_id).await {
        Ok(prediction) => {
            println!(
                "\n🎯 {} (week {}/{}, confidence {})",
                prediction.prediction_type,
                prediction.current_week,
                prediction.total_weeks,
                format_percentage(prediction.confidence)
            );
            println!(
                "{:<4} {:<24} {:>6} {:>6} {:>8} {:>8} {:>8}",
                "#", "Team", "Pts", "Pred", "Title", "Top 3", "Last"
            );
            for p in &prediction.team_predictions {
                println!(
                    "{:<4} {:<24} {:>6} {:>6} {:>8} {:>8} {:>8}",
                    p.most_likely_position,
                    p.team_name,
                    p.current_points,
                    p.predicted_points,
                    format_percentage(p.championship_probability),
                    format_percentage(p.top_three_probability),
                    format_percentage(p.relegation_probability)
                );
            }
        }
        Err(e) if e.kind() == ErrorKind::Precondition => {
            println!("⚠️  {}", e);
            println!("\n🎲 Single simulated final table instead:");
            let projected = leagues.predict_final_standings(league_id).await?;
            print_standings(&projected, None);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn query_team(config: &Config, name: &str) -> Result<()> {
    let pool = open_pool(config).await?;
    let teams = TeamService::new(pool);

    println!("🔍 Searching for team: {}", name);

    match teams.find_by_name(name).await? {
        Some((team, score)) => {
            println!("📊 Team Details:");
            println!("   Id: {}", team.id);
            println!("   Name: {}", team.name);
            println!("   Strength: {}", team.strength);
            println!("   Match score: {:.2}", score);
        }
        None => {
            println!("❌ No teams found matching '{}'", name);
            println!("\n💡 Available teams:");
            for team in teams.list().await? {
                println!("   • {} (strength {})", team.name, team.strength);
            }
        }
    }
    Ok(())
}

pub async fn export(
    config: &Config,
    league_id: i64,
    format: ExportFormat,
    output: Option<String>,
) -> Result<()> {
    let pool = open_pool(config).await?;
    let standings = league_service(pool, config)
        .current_standings(league_id)
        .await?
        .sorted();

    let path = output.unwrap_or_else(|| {
        format!("league_{}_standings.{}", league_id, format.extension())
    });

    match format {
        ExportFormat::Csv => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("cannot create {}", path))?;
            write_standings_csv(file, &standings)?;
        }
        ExportFormat::Json => {
            let json = serde_json::to_string_pretty(&standings)?;
            tokio::fs::write(&path, json).await?;
        }
    }

    println!(
        "💾 Exported {} rows of week {} standings to {}",
        standings.teams.len(),
        standings.week,
        path
    );
    Ok(())
}

#[derive(Serialize)]
struct StandingRow<'a> {
    position: usize,
    team: &'a str,
    played: i32,
    wins: i32,
    draws: i32,
    losses: i32,
    goals_for: i32,
    goals_against: i32,
    goal_difference: i32,
    points: i32,
}

fn write_standings_csv<W: Write>(writer: W, standings: &Standings) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (index, row) in standings.teams.iter().enumerate() {
        writer.serialize(StandingRow {
            position: index + 1,
            team: &row.team_name,
            played: row.played,
            wins: row.wins,
            draws: row.draws,
            losses: row.losses,
            goals_for: row.goals_for,
            goals_against: row.goals_against,
            goal_difference: row.goal_difference,
            points: row.points,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn team_name(league: &League, team_id: i64) -> &str {
    league.team(team_id).map_or("?", |t| t.name.as_str())
}

/// Prints the table; form and points share need the league's matches.
fn print_standings(standings: &Standings, league: Option<&League>) {
    println!(
        "\n{:<4} {:<24} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4} {:>4}  {:<6} {:>6}",
        "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts", "Form", "Pts%"
    );
    for (index, row) in standings.teams.iter().enumerate() {
        let form = league
            .map(|l| team_form(&l.matches, row.team_id))
            .unwrap_or_default();
        println!(
            "{:<4} {:<24} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4} {:>4}  {:<6} {:>6}",
            index + 1,
            row.team_name,
            row.played,
            row.wins,
            row.draws,
            row.losses,
            row.goals_for,
            row.goals_against,
            row.goal_difference,
            row.points,
            form,
            format_percentage(calculate_points_percentage(row.wins, row.draws, row.losses))
        );
    }
}
